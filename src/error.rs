//! Error taxonomy for the action path
//!
//! Storage and channel failures are plain `anyhow` errors that get logged and
//! replaced by defaults; they never reach this module.

use thiserror::Error;

use crate::constants::notices;

/// Checked before any remote call; aborts the action with a notice
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("nothing to rewrite")]
    EmptyOperand,
}

impl ValidationError {
    /// Text shown to the user
    pub fn notice(&self) -> &'static str {
        match self {
            ValidationError::MissingApiKey => notices::MISSING_API_KEY,
            ValidationError::EmptyOperand => notices::EMPTY_OPERAND,
        }
    }
}

/// Failure of the remote rewrite call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteCallError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no response from AI")]
    EmptyResponse,
}

/// The result could not be put back where the operand came from
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteBackError {
    #[error("the selected text changed before the rewrite arrived")]
    FragmentChanged,
}

impl WriteBackError {
    pub fn notice(&self) -> &'static str {
        match self {
            WriteBackError::FragmentChanged => notices::FRAGMENT_CHANGED,
        }
    }
}
