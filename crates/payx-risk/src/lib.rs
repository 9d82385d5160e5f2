//! Rule-based risk scoring. Pure and deterministic: the admission
//! coordinator assembles a [`RiskContext`] from repository reads and gets
//! back a clamped additive score plus an ALLOW/REVIEW/BLOCK decision.

pub mod engine;
pub mod types;

pub use engine::{evaluate, RiskEngine};
pub use types::{RiskContext, RiskRule};
