//! Outbox draining: a poll-based worker that claims payments, drives the
//! provider call, and finalizes payment + completion event in the same
//! transaction as the consumed work item.

pub mod finalize;
pub mod worker;

pub use worker::{OutboxWorker, WorkerSettings};
