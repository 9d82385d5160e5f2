//! Resilience primitives shared by the provider driver and the outbox
//! worker: a counter-based circuit breaker, a per-key bulkhead, exponential
//! backoff with jitter, and a retry harness.

pub mod backoff;
pub mod breaker;
pub mod bulkhead;
pub mod retry;

pub use backoff::exp_backoff;
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState};
pub use bulkhead::Bulkhead;
pub use retry::{retry, RetryPolicy};
