// Message types shared by the CLI, the command queue and the AMDC layer

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bearing::{ForceVector, Formulation, PoleVector};

/// One inverse-solution candidate with what it produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    /// Excitation space vector (re, im)
    pub space_vector: (f64, f64),
    /// Per-pole control excitation
    pub control: [f64; 3],
    /// Per-pole total field (control + bias)
    pub total_field: [f64; 3],
    /// Force the candidate produces when applied
    pub force: ForceVector,
    pub saturated: bool,
}

impl CandidateReport {
    pub fn control_norm(&self) -> f64 {
        PoleVector::from(self.control).norm()
    }
}

/// All candidates for one requested force
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub request: ForceVector,
    pub formulation: Formulation,
    pub candidates: Vec<CandidateReport>,
    /// Index of the minimum-norm unsaturated candidate
    pub selected: Option<usize>,
}

impl fmt::Display for AllocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = 25;
        writeln!(f, "\nInput:")?;
        writeln!(
            f,
            "{:^30}",
            format!(
                "Magnitude = {},  \u{03B1} = {}",
                self.request.magnitude, self.request.direction_deg
            )
        )?;
        writeln!(f, "\nOutput:")?;
        writeln!(
            f,
            "{:^w$}{:^w$}{:^w$}{:<w$}",
            "Space-Vector:", "Total Field:", "Magnitude:", "\u{03B1}:"
        )?;
        for (i, c) in self.candidates.iter().enumerate() {
            let sv = format!("{:.3} + {:.3}j", c.space_vector.0, c.space_vector.1);
            let field = format!(
                "[{:.3} {:.3} {:.3}]",
                c.total_field[0], c.total_field[1], c.total_field[2]
            );
            let mark = if Some(i) == self.selected { " *" } else { "" };
            writeln!(
                f,
                "{:^w$}{:^w$}{:^w$}{:<w$}",
                sv,
                field,
                format!("{:.1}", c.force.magnitude),
                format!("{:.1}{}", c.force.direction_deg, mark)
            )?;
        }
        Ok(())
    }
}

/// Selected control currents for a requested force
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentsReport {
    pub request: ForceVector,
    pub currents: [f64; 3],
    pub ampere_turns: bool,
}

/// Rating results for a saturating bearing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingReport {
    pub direction_deg: f64,
    pub max_force: f64,
    pub hexagon_bound: f64,
}

/// One step of an operator-driven experiment sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueCommand {
    /// Send a raw AMDC command line
    Raw { text: String },
    /// Allocate a radial force and command the resulting currents
    Force { direction_deg: f64, magnitude: f64 },
    /// Zero the radial currents and voltages
    Zero,
}

impl fmt::Display for QueueCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw { text } => write!(f, "{}", text),
            Self::Force {
                direction_deg,
                magnitude,
            } => write!(f, "force {} N at {}°", magnitude, direction_deg),
            Self::Zero => write!(f, "zero"),
        }
    }
}

/// A queued command with an operator note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub command: QueueCommand,
    #[serde(default)]
    pub info: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_entries_from_json() {
        let entries: Vec<QueueEntry> = serde_json::from_str(
            r#"[
                { "command": { "kind": "raw", "text": "cramb init_cc" }, "info": "enable" },
                { "command": { "kind": "force", "direction_deg": 30.0, "magnitude": 100.0 } },
                { "command": { "kind": "zero" } }
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].info, "enable");
        assert_eq!(entries[1].info, "");
        assert_eq!(entries[2].command, QueueCommand::Zero);
        assert_eq!(entries[1].command.to_string(), "force 100 N at 30°");
    }
}
