// Force/torque sensor log averaging
//
// Each log is a fixed-length text header followed by whitespace-separated
// rows: time, then the six load channels in LOG_COLUMNS order.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::{LOG_COLUMNS, LOG_HEADER_LINES};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: '{token}' is not a number")]
    Parse { line: usize, token: String },

    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("No data rows after the {0}-line header")]
    Empty(usize),
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Mean load over one log, per channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceTorqueAverages {
    #[serde(rename = "My")]
    pub my: f64,
    #[serde(rename = "Fz")]
    pub fz: f64,
    #[serde(rename = "Fx")]
    pub fx: f64,
    #[serde(rename = "Fy")]
    pub fy: f64,
    #[serde(rename = "Mx")]
    pub mx: f64,
    #[serde(rename = "Mz")]
    pub mz: f64,
}

impl ForceTorqueAverages {
    fn from_columns(c: [f64; 6]) -> Self {
        Self {
            my: c[0],
            fz: c[1],
            fx: c[2],
            fy: c[3],
            mx: c[4],
            mz: c[5],
        }
    }

    /// (label, value) pairs in file column order
    pub fn labelled(&self) -> [(&'static str, f64); 6] {
        let values = [self.my, self.fz, self.fx, self.fy, self.mx, self.mz];
        std::array::from_fn(|i| (LOG_COLUMNS[i], values[i]))
    }
}

/// Average a log file on disk
pub fn extract_averages(path: &Path) -> Result<ForceTorqueAverages> {
    let text = std::fs::read_to_string(path)?;
    let averages = average_log(&text, LOG_HEADER_LINES)?;
    debug!("{}: {:?}", path.display(), averages);
    Ok(averages)
}

/// Average the data rows of a log, dropping the time column
pub fn average_log(text: &str, header_lines: usize) -> Result<ForceTorqueAverages> {
    let expected = LOG_COLUMNS.len() + 1;
    let mut sums = [0.0; 6];
    let mut rows = 0usize;

    for (i, line) in text.lines().enumerate().skip(header_lines) {
        let line_no = i + 1;
        let data = line.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = data.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != expected {
            return Err(LogError::ColumnCount {
                line: line_no,
                expected,
                found: tokens.len(),
            });
        }
        for (sum, token) in sums.iter_mut().zip(&tokens[1..]) {
            let value: f64 = token.parse().map_err(|_| LogError::Parse {
                line: line_no,
                token: token.to_string(),
            })?;
            *sum += value;
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(LogError::Empty(header_lines));
    }
    Ok(ForceTorqueAverages::from_columns(
        sums.map(|s| s / rows as f64),
    ))
}
