use thiserror::Error;

use sentinel_core::{NotFoundError, TransitionError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),

    #[error("Invalid finding: {0}")]
    InvalidFinding(String),

    #[error("Alert book busy for {timeout_ms}ms")]
    Busy { timeout_ms: u64 },
}

impl AlertError {
    /// Only contention is worth retrying; the rest fail the same way again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AlertError::Busy { .. })
    }
}

pub type AlertResult<T> = std::result::Result<T, AlertError>;
