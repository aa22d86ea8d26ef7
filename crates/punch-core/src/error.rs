//! Error types for punch runs.

use std::time::Duration;

use punch_browser::BrowserError;
use punch_relay::RelayError;
use thiserror::Error;

/// Configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variables are not set.
    #[error("missing environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable is set but unusable.
    #[error("invalid {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Errors that abort a punch run.
#[derive(Debug, Error)]
pub enum PunchError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The relay was unreachable or refused a required send.
    #[error("relay transport error: {0}")]
    Transport(#[from] RelayError),

    /// Browser automation failed.
    #[error("browser error: {0}")]
    Browser(BrowserError),

    /// An expected page element never appeared.
    #[error("timed out after {after:?} waiting for {what}")]
    AutomationTimeout {
        /// Description of the awaited condition.
        what: String,
        /// How long we waited.
        after: Duration,
    },

    /// The CAPTCHA image could not be captured.
    #[error("captcha challenge unavailable: {0}")]
    Challenge(String),

    /// The operator did not provide an answer.
    #[error("captcha approval aborted: {0}")]
    ApprovalAborted(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for punch operations.
pub type Result<T> = std::result::Result<T, PunchError>;

impl From<BrowserError> for PunchError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Timeout { what, after } => PunchError::AutomationTimeout { what, after },
            other => PunchError::Browser(other),
        }
    }
}
