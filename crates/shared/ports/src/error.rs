use thiserror::Error;

/// Failure to hand an alert to a downstream consumer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Consumer unavailable: {0}")]
    Unavailable(String),

    #[error("Consumer rejected alert: {0}")]
    Rejected(String),

    #[error("No subscribers")]
    NoSubscribers,
}

impl DispatchError {
    /// Whether another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::Rejected(_))
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
