//! Punch actions and run results.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which timecard control to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunchAction {
    In,
    Out,
}

impl PunchAction {
    /// Lowercase name used in paths and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchAction::In => "in",
            PunchAction::Out => "out",
        }
    }

    /// 1-based position of this action's control in the punch row.
    pub fn control_position(&self) -> usize {
        match self {
            PunchAction::In => 1,
            PunchAction::Out => 2,
        }
    }
}

impl fmt::Display for PunchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PunchAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(PunchAction::In),
            "out" => Ok(PunchAction::Out),
            other => Err(format!("unknown punch action '{}' (expected 'in' or 'out')", other)),
        }
    }
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchOutcome {
    /// The control was pressed and the confirmation dialog closed.
    Punched,
    /// The control was already disabled; nothing was clicked.
    AlreadyPunched,
}

/// Result of a completed punch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchResult {
    pub action: PunchAction,
    pub outcome: PunchOutcome,
    /// Where the evidence screenshot was stored.
    pub screenshot_path: PathBuf,
}

impl PunchResult {
    /// A completed run always succeeded; failures are errors.
    pub fn succeeded(&self) -> bool {
        true
    }

    /// Whether the action had already been recorded before this run.
    pub fn already_punched(&self) -> bool {
        self.outcome == PunchOutcome::AlreadyPunched
    }

    /// One-line summary for the operator.
    pub fn summary(&self) -> String {
        match self.outcome {
            PunchOutcome::Punched => format!("✅ Punched {} successfully", self.action),
            PunchOutcome::AlreadyPunched => format!("⛔ Already punched {}", self.action),
        }
    }
}
