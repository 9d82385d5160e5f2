use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::OutboxEvent;
use crate::enums::EventType;

pub const REVIEW_REASON_RISK_OR_AML: &str = "risk_or_aml_review";

/// Envelope handed to external publishers consuming the outbox table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
    pub payload: Value,
    pub attempts: i32,
}

impl DomainEvent {
    /// Render an outbox row into the wire envelope external publishers
    /// ship. Status is intentionally absent; consumers only see rows the
    /// publisher selected.
    pub fn from_outbox(event: &OutboxEvent) -> Self {
        Self {
            event_id: event.event_id,
            aggregate_id: event.aggregate_id,
            event_type: event.event_type,
            created_at: event.created_at,
            payload: event.payload.clone(),
            attempts: event.attempts,
        }
    }
}

/// Carries the tracing context so downstream spans link back to the
/// admission that produced the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequestedPayload {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReviewRequiredPayload {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedPayload {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub provider: String,
    pub provider_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedPayload {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub provider: String,
    pub error_category: String,
    pub reason: String,
}
