use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::enums::{
    AmlDecision, CustomerStatus, EventType, KycLevel, OutboxStatus, PaymentMethod, PaymentStatus,
    RiskDecision,
};

/// Externally seeded customer record; immutable in this pipeline.
#[derive(Debug, Clone)]
pub struct Customer {
    pub customer_id: String,
    pub kyc_level: KycLevel,
    pub status: CustomerStatus,
    /// Missing on legacy seed rows; the risk engine treats missing as new.
    pub created_at: Option<DateTime<Utc>>,
}

/// Per-rail limits policy. Serialized as JSON into the policy cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsPolicy {
    pub rail: PaymentMethod,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub daily_limit_amount: Decimal,
    pub velocity_limit_count: i32,
    pub velocity_window_seconds: i64,
}

/// Payment aggregate root.
#[derive(Debug, Clone)]
pub struct Payment {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub customer_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub destination: Option<String>,
    pub status: PaymentStatus,
    pub idempotency_key: String,
    pub risk_score: Option<i32>,
    pub risk_decision: Option<RiskDecision>,
    pub aml_decision: Option<AmlDecision>,
    pub metadata: Option<Value>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Strictly increasing on every state-changing update; concurrent
    /// updaters must observe the previous value.
    pub version: i32,
}

/// Durable event row written in the same transaction as the state change it
/// describes, drained asynchronously by the outbox worker.
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: EventType,
    pub payload: Value,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
}

/// Snapshot of the response served for the first accepted request with a
/// given `(merchant_id, idempotency_key)`. Replays return it verbatim.
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub merchant_id: String,
    pub idempotency_key: String,
    pub payment_id: Uuid,
    pub status_code: i32,
    pub response_payload: Value,
    pub created_at: DateTime<Utc>,
}
