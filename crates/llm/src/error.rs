use std::time::Duration;

use switchboard_common::SwitchboardError;
use thiserror::Error;

/// Failure of a single completion request.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl LlmError {
    /// Rate limiting and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Transport(_) => true,
            Self::InvalidResponse(_) | Self::Rejected(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<LlmError> for SwitchboardError {
    fn from(err: LlmError) -> Self {
        SwitchboardError::Llm(err.to_string())
    }
}
