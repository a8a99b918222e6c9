// Text command link to the AMDC controller board
//
// Commands are plain ASCII lines terminated by CR LF. The board echoes
// free-form output lines; logged variables are dumped as "> <ts_us> <value>"
// rows closed by an END marker.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{
    AMDC_ALLOWED_EMPTY_READS, AMDC_BAUDRATE, AMDC_CHAR_DELAY, AMDC_CMD_DELAY, AMDC_ECHO_PREFIX,
    AMDC_LOG_END, AMDC_READ_TIMEOUT,
};
use crate::error::AllocationError;

/// Empty reads tolerated while waiting for a log dump to finish
const LOG_DUMP_MAX_EMPTY_READS: usize = 1000;

/// Error types for AMDC communication
#[derive(Debug, thiserror::Error)]
pub enum AmdcError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response to '{command}': {reason}")]
    UnexpectedResponse { command: String, reason: String },

    #[error("Log dump of variable {index} ended without the END marker")]
    LogIncomplete { index: usize },

    #[error("Inverter {number} is not wired to the {stage} stage")]
    InvalidInverter { number: u8, stage: &'static str },

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

pub type Result<T> = std::result::Result<T, AmdcError>;

/// Pacing and echo settings for the command link
#[derive(Debug, Clone, Copy)]
pub struct LinkSettings {
    /// Wait after a full command before reading its output
    pub cmd_delay: Duration,
    /// Wait between bytes so the board's UART keeps up
    pub char_delay: Duration,
    /// Log each command as it is sent
    pub echo: bool,
    /// Consecutive empty reads that end a response
    pub allowed_empty_reads: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            cmd_delay: AMDC_CMD_DELAY,
            char_delay: AMDC_CHAR_DELAY,
            echo: true,
            allowed_empty_reads: AMDC_ALLOWED_EMPTY_READS,
        }
    }
}

/// One logged sample: (timestamp in seconds, value)
pub type LogSample = (f64, f64);

/// Line-oriented command link over any byte transport
pub struct AmdcLink<T = Box<dyn SerialPort>> {
    port: T,
    settings: LinkSettings,
}

impl AmdcLink {
    /// Open the AMDC serial port at the default baudrate
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, AMDC_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        info!("Opening AMDC link on {} at {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(AMDC_READ_TIMEOUT)
            .open()?;
        Ok(Self::new(port, LinkSettings::default()))
    }
}

impl<T: Read + Write> AmdcLink<T> {
    pub fn new(port: T, settings: LinkSettings) -> Self {
        Self { port, settings }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Send a command and collect the non-empty lines it prints
    pub fn cmd(&mut self, command: &str) -> Result<Vec<String>> {
        self.send(command)?;

        let mut output = Vec::new();
        let mut empty = 0;
        while empty < self.settings.allowed_empty_reads {
            let line = self.read_line()?;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                empty += 1;
            } else {
                output.push(trimmed.to_string());
                empty = 0;
            }
        }
        debug!("'{}' -> {} lines", command, output.len());
        Ok(output)
    }

    /// Dump a logged variable as (seconds, value) samples
    pub fn log_dump(&mut self, index: usize) -> Result<Vec<LogSample>> {
        self.send(&format!("log dump {}", index))?;

        let mut samples = Vec::new();
        let mut empty = 0;
        loop {
            let line = self.read_line()?;
            if line.is_empty() {
                empty += 1;
                if empty >= LOG_DUMP_MAX_EMPTY_READS {
                    return Err(AmdcError::LogIncomplete { index });
                }
                continue;
            }
            empty = 0;
            if line.contains(AMDC_LOG_END) {
                break;
            }
            if let Some(sample) = parse_sample(&line) {
                samples.push(sample);
            }
        }

        // discard whatever trails the marker
        while !self.read_line()?.is_empty() {}

        info!("Log variable {}: {} samples", index, samples.len());
        Ok(samples)
    }

    /// Write `command\r\n` a byte at a time, then wait for it to run
    fn send(&mut self, command: &str) -> Result<()> {
        let framed = format!("{}\r\n", command);
        for byte in framed.bytes() {
            self.port.write_all(&[byte])?;
            self.port.flush()?;
            pause(self.settings.char_delay);
        }
        pause(self.settings.cmd_delay);

        if self.settings.echo {
            info!("{}{}", AMDC_ECHO_PREFIX, command);
        }
        Ok(())
    }

    /// Read up to and including the next newline
    ///
    /// Returns whatever arrived before the read timed out, which may be empty.
    fn read_line(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    bytes.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(AmdcError::Io(e)),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.port
    }
}

/// Parse a "> <ts_us> <value>" row; zero timestamps are not samples
fn parse_sample(line: &str) -> Option<LogSample> {
    let mut fields = line.split_whitespace();
    if fields.next()? != ">" {
        return None;
    }
    let ts_us: i64 = fields.next()?.parse().ok()?;
    let value: f64 = fields.next()?.parse().ok()?;
    if ts_us == 0 {
        return None;
    }
    Some((ts_us as f64 / 1e6, value))
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
