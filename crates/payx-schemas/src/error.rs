use crate::enums::{ErrorCategory, RateLimitDimension};

/// Synchronous admission failures. Each variant carries its surface
/// category; the edge maps categories onto HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("{0}")]
    Validation(String),

    #[error("Idempotency key conflict")]
    IdempotencyConflict,

    #[error("Concurrent update conflict")]
    ConcurrencyConflict,

    #[error("{0}")]
    KycDenied(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("Rate limited by {}", .0.as_str())]
    RateLimited(RateLimitDimension),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdmissionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AdmissionError::Validation(_) => ErrorCategory::ValidationError,
            AdmissionError::IdempotencyConflict => ErrorCategory::IdempotencyConflict,
            AdmissionError::ConcurrencyConflict => ErrorCategory::ConcurrencyConflict,
            AdmissionError::KycDenied(_) => ErrorCategory::KycDenied,
            AdmissionError::LimitExceeded(_) => ErrorCategory::LimitExceeded,
            AdmissionError::RateLimited(_) => ErrorCategory::RateLimited,
            AdmissionError::Internal(_) => ErrorCategory::Unexpected,
        }
    }

    /// The dimension hint carried by 429 responses.
    pub fn rate_limit_dimension(&self) -> Option<RateLimitDimension> {
        match self {
            AdmissionError::RateLimited(dimension) => Some(*dimension),
            _ => None,
        }
    }
}
