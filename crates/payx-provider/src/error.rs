use payx_schemas::enums::ErrorCategory;

/// Failures from a provider confirm call.
///
/// The transient set (timeout, upstream 5xx, open breaker) is what the
/// retry harness is allowed to chase. Everything else is terminal for the
/// attempt: non-2xx/non-5xx statuses, transport faults and malformed
/// responses surface as `Unexpected` and take the worker's unclassified
/// path.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider timeout")]
    Timeout,

    #[error("Provider returned {status}")]
    Upstream5xx { status: u16 },

    #[error("circuit is open")]
    CircuitOpen,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout | ProviderError::Upstream5xx { .. } | ProviderError::CircuitOpen
        )
    }

    /// True for the errors the worker reschedules with backoff; an open
    /// breaker escaping the driver is not one of them.
    pub fn is_classified(&self) -> bool {
        matches!(self, ProviderError::Timeout | ProviderError::Upstream5xx { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::Timeout => ErrorCategory::ProviderTimeout,
            ProviderError::Upstream5xx { .. } => ErrorCategory::Provider5xx,
            ProviderError::CircuitOpen | ProviderError::Unexpected(_) => ErrorCategory::Unexpected,
        }
    }
}
