//! Error types for relay operations.

use thiserror::Error;

/// Errors that can occur while talking to the message relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay could not be reached or the response body was unreadable.
    #[error("relay HTTP error: {0}")]
    Http(String),

    /// The relay answered but refused the request.
    #[error("relay rejected {method}: {description}")]
    Rejected {
        /// Bot API method that was called.
        method: &'static str,
        /// Description reported by the relay.
        description: String,
    },

    /// The response JSON did not have the expected shape.
    #[error("failed to decode {method} response: {reason}")]
    Decode {
        /// Bot API method that was called.
        method: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The outgoing payload could not be built.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest includes the request URL in its messages, which carries the bot token.
        RelayError::Http(e.without_url().to_string())
    }
}
