//! Provider-rail plumbing: strategy selection, the HTTP client adapter, and
//! the driver that wraps every confirm call in a circuit breaker, a
//! per-provider bulkhead slot and a bounded retry harness.

pub mod client;
pub mod driver;
pub mod error;
pub mod strategy;

pub use client::{HttpProviderClient, ProviderApi};
pub use driver::ProviderDriver;
pub use error::ProviderError;
pub use strategy::{strategy_for, ProviderStrategy};
