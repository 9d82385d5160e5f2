//! Synchronous admission gates.
//!
//! Ordering is fixed by the coordinator: KYC first (cheapest, fully
//! deterministic), then limits (which also produces the projected velocity
//! the risk engine consumes), then the rate limiter last so quota is not
//! burned on requests that would be rejected outright.

pub mod idempotency;
pub mod kyc;
pub mod limits;
pub mod rate_limit;

pub use idempotency::IdempotencyGate;
pub use kyc::enforce_kyc;
pub use limits::{LimitsEvaluation, LimitsService, OutgoingStore, PolicyStore};
pub use rate_limit::RateLimiter;
