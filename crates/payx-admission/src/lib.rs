//! Admission coordination: the create-payment pipeline, the manual review
//! workflow, and the payment status projection.

pub mod create;
pub mod resolve;
pub mod review;
pub mod status;

pub use create::{CreatePayment, RequestHeaders};
pub use resolve::resolve_status;
pub use review::ReviewWorkflow;
pub use status::get_payment_status;

use uuid::Uuid;

/// Correlation id carried in responses and outbox payloads. Hex-encoded so
/// it slots into W3C-style trace tooling downstream.
pub(crate) fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}
