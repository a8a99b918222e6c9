// Operator-driven command queue
//
// Steps through a prepared list of commands one key at a time:
// h help, n next, p previous, e execute, q quit.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::messages::QueueEntry;

const BANNER_WIDTH: usize = 50;
const KEY_POLL: Duration = Duration::from_millis(50);

/// Something that can run queued commands
pub trait CommandExecutor {
    type Error: fmt::Display;

    /// Run one entry; `index` is its position in the queue
    fn execute(&mut self, entry: &QueueEntry, index: usize) -> Result<(), Self::Error>;

    /// Called once when the operator quits
    fn quit(&mut self);
}

/// Operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKey {
    Help,
    Next,
    Previous,
    Execute,
    Quit,
    Other,
}

impl QueueKey {
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_lowercase() {
            'h' => Self::Help,
            'n' => Self::Next,
            'p' => Self::Previous,
            'e' => Self::Execute,
            'q' => Self::Quit,
            _ => Self::Other,
        }
    }
}

/// What a key press did
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Moved,
    Help,
    Executed,
    NotExecuted(String),
    Invalid,
    Quit,
}

#[derive(Debug, Clone)]
pub struct CommandQueue {
    entries: Vec<QueueEntry>,
    index: usize,
}

impl CommandQueue {
    pub fn new(entries: Vec<QueueEntry>) -> Self {
        Self { entries, index: 0 }
    }

    /// Load a JSON array of queue entries
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&text)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.entries.get(self.index)
    }

    /// Apply one key press
    pub fn handle<E: CommandExecutor>(&mut self, key: QueueKey, executor: &mut E) -> Step {
        let step = match key {
            QueueKey::Help => Step::Help,
            QueueKey::Next => {
                self.index += 1;
                Step::Moved
            }
            QueueKey::Previous => {
                self.index = self.index.saturating_sub(1);
                Step::Moved
            }
            QueueKey::Execute => match self.current() {
                Some(entry) => match executor.execute(entry, self.index) {
                    Ok(()) => {
                        self.index += 1;
                        Step::Executed
                    }
                    Err(e) => {
                        warn!("Command {} failed: {}", self.index, e);
                        Step::NotExecuted(e.to_string())
                    }
                },
                None => Step::NotExecuted("queue is empty".to_string()),
            },
            QueueKey::Quit => {
                executor.quit();
                Step::Quit
            }
            QueueKey::Other => Step::Invalid,
        };
        self.index = self.index.min(self.entries.len().saturating_sub(1));
        step
    }

    /// Header line marking the queue position
    pub fn banner(&self) -> String {
        if self.index == 0 {
            centered("  START  ", '#')
        } else if self.index + 1 == self.entries.len() {
            centered("  End  ", '#')
        } else {
            "#".repeat(BANNER_WIDTH)
        }
    }
}

fn centered(label: &str, fill: char) -> String {
    let pad = BANNER_WIDTH.saturating_sub(label.chars().count());
    let left = pad / 2;
    format!(
        "{}{}{}",
        fill.to_string().repeat(left),
        label,
        fill.to_string().repeat(pad - left)
    )
}

fn help_menu() -> String {
    [
        "_____ Help Menu _____",
        "(H/h) -- Help Menu",
        "(N/n) -- Next Command",
        "(P/p) -- Previous Command",
        "(E/e) -- Execute Command",
        "(Q/q) -- Quit",
    ]
    .join("\r\n")
}

/// Drive the queue from the keyboard until the operator quits
pub fn run_interactive<E: CommandExecutor>(
    queue: &mut CommandQueue,
    executor: &mut E,
) -> io::Result<()> {
    if queue.is_empty() {
        warn!("Command queue is empty");
        return Ok(());
    }
    info!("Command queue: {} entries", queue.len());

    enable_raw_mode()?;
    let result = key_loop(queue, executor);
    disable_raw_mode()?;
    result
}

fn key_loop<E: CommandExecutor>(queue: &mut CommandQueue, executor: &mut E) -> io::Result<()> {
    let mut out = io::stdout();
    show_current(&mut out, queue)?;

    loop {
        if !event::poll(KEY_POLL)? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        let key = match code {
            KeyCode::Char(c) => QueueKey::from_char(c),
            KeyCode::Esc => QueueKey::Quit,
            _ => QueueKey::Other,
        };

        match queue.handle(key, executor) {
            Step::Help => write!(out, "\r\n{}\r\n", help_menu())?,
            Step::Executed => write!(out, "Executed\r\n")?,
            Step::NotExecuted(reason) => write!(out, "Not Executed!! ({})\r\n", reason)?,
            Step::Invalid => write!(out, "Invalid Input\r\n")?,
            Step::Moved => {}
            Step::Quit => {
                write!(out, "{}\r\n", centered("  DONE  ", '#'))?;
                out.flush()?;
                return Ok(());
            }
        }
        show_current(&mut out, queue)?;
    }
}

fn show_current(out: &mut impl Write, queue: &CommandQueue) -> io::Result<()> {
    if let Some(entry) = queue.current() {
        write!(out, "{}\r\n", queue.banner())?;
        write!(out, "Info: {}\r\n", entry.info)?;
        write!(out, "Current Command: {}\r\n", entry.command)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::QueueCommand;

    #[derive(Default)]
    struct Recorder {
        executed: Vec<usize>,
        fail_on: Option<usize>,
        quit: bool,
    }

    impl CommandExecutor for Recorder {
        type Error = String;

        fn execute(&mut self, _entry: &QueueEntry, index: usize) -> Result<(), String> {
            if self.fail_on == Some(index) {
                return Err("board did not answer".to_string());
            }
            self.executed.push(index);
            Ok(())
        }

        fn quit(&mut self) {
            self.quit = true;
        }
    }

    fn queue(n: usize) -> CommandQueue {
        CommandQueue::new(
            (0..n)
                .map(|i| QueueEntry {
                    command: QueueCommand::Raw {
                        text: format!("cmd {}", i),
                    },
                    info: String::new(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_keys_map_case_insensitively() {
        assert_eq!(QueueKey::from_char('E'), QueueKey::Execute);
        assert_eq!(QueueKey::from_char('n'), QueueKey::Next);
        assert_eq!(QueueKey::from_char('x'), QueueKey::Other);
    }

    #[test]
    fn test_index_is_clamped() {
        let mut q = queue(3);
        let mut rec = Recorder::default();
        assert_eq!(q.handle(QueueKey::Previous, &mut rec), Step::Moved);
        assert_eq!(q.index(), 0);
        for _ in 0..5 {
            q.handle(QueueKey::Next, &mut rec);
        }
        assert_eq!(q.index(), 2);
    }

    #[test]
    fn test_execute_advances_on_success_only() {
        let mut q = queue(3);
        let mut rec = Recorder {
            fail_on: Some(1),
            ..Default::default()
        };
        assert_eq!(q.handle(QueueKey::Execute, &mut rec), Step::Executed);
        assert_eq!(q.index(), 1);
        assert!(matches!(
            q.handle(QueueKey::Execute, &mut rec),
            Step::NotExecuted(_)
        ));
        assert_eq!(q.index(), 1);
        assert_eq!(rec.executed, vec![0]);
    }

    #[test]
    fn test_execute_last_entry_stays_on_it() {
        let mut q = queue(2);
        let mut rec = Recorder::default();
        q.handle(QueueKey::Execute, &mut rec);
        q.handle(QueueKey::Execute, &mut rec);
        assert_eq!(q.index(), 1);
        assert_eq!(rec.executed, vec![0, 1]);
    }

    #[test]
    fn test_quit_notifies_executor() {
        let mut q = queue(2);
        let mut rec = Recorder::default();
        assert_eq!(q.handle(QueueKey::Quit, &mut rec), Step::Quit);
        assert!(rec.quit);
        assert_eq!(q.handle(QueueKey::Other, &mut rec), Step::Invalid);
    }

    #[test]
    fn test_banner_marks_start_and_end() {
        let mut q = queue(3);
        let mut rec = Recorder::default();
        assert!(q.banner().contains("START"));
        assert_eq!(q.banner().len(), BANNER_WIDTH);
        q.handle(QueueKey::Next, &mut rec);
        assert_eq!(q.banner(), "#".repeat(BANNER_WIDTH));
        q.handle(QueueKey::Next, &mut rec);
        assert!(q.banner().contains("End"));
    }
}
