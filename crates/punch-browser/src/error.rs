//! Error types for browser automation.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser process could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// A DevTools protocol call failed.
    #[error("browser protocol error: {0}")]
    Cdp(String),

    /// No element matched the selector.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// An expected page condition did not occur in time.
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout {
        /// Description of the awaited condition.
        what: String,
        /// How long we waited.
        after: Duration,
    },

    /// A page check returned something unexpected.
    #[error("page script error: {0}")]
    Script(String),
}

/// Result type for browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(e.to_string())
    }
}
