use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::enums::{AmlDecision, PaymentMethod, PaymentStatus, RiskDecision};

/// Body of POST /payments. Header-borne identifiers (merchant, customer,
/// account, idempotency key) travel separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// The single response shape for admission and review operations. This is
/// also what gets frozen into the idempotency snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAcceptedResponse {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub trace_id: String,
    #[serde(default)]
    pub risk_decision: Option<RiskDecision>,
    #[serde(default)]
    pub aml_decision: Option<AmlDecision>,
}

/// Full payment projection returned by GET /payments/{id}. Everything from
/// the aggregate except metadata internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub customer_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub idempotency_key: String,
    #[serde(default)]
    pub risk_score: Option<i32>,
    #[serde(default)]
    pub risk_decision: Option<RiskDecision>,
    #[serde(default)]
    pub aml_decision: Option<AmlDecision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// POST body sent to `/providers/{rail}/confirm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
}

/// Provider confirm response. `duplicate` and `partial_failure` default to
/// false so older providers that omit them still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider_reference: String,
    pub confirmed: bool,
    pub provider: String,
    #[serde(default)]
    pub duplicate: bool,
    #[serde(default)]
    pub partial_failure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_request_parses_decimal_amount_exactly() {
        let req: CreatePaymentRequest = serde_json::from_str(
            r#"{"amount": 96.01, "currency": "BRL", "method": "PIX", "destination": "dest-1"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, dec!(96.01));
        assert_eq!(req.method, PaymentMethod::PIX);
        assert_eq!(req.destination.as_deref(), Some("dest-1"));
        assert!(req.metadata.is_none());
    }

    #[test]
    fn provider_response_defaults_optional_flags() {
        let resp: ProviderResponse = serde_json::from_str(
            r#"{"provider_reference": "ref-1", "confirmed": true, "provider": "pix-provider"}"#,
        )
        .unwrap();
        assert!(resp.confirmed);
        assert!(!resp.duplicate);
        assert!(!resp.partial_failure);
    }

    #[test]
    fn accepted_response_snapshot_roundtrips() {
        let resp = PaymentAcceptedResponse {
            payment_id: Uuid::new_v4(),
            status: PaymentStatus::InReview,
            trace_id: "deadbeef".to_string(),
            risk_decision: Some(RiskDecision::Allow),
            aml_decision: Some(AmlDecision::Review),
        };
        let json = serde_json::to_value(&resp).unwrap();
        let back: PaymentAcceptedResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.payment_id, resp.payment_id);
        assert_eq!(back.status, PaymentStatus::InReview);
        assert_eq!(back.aml_decision, Some(AmlDecision::Review));
    }
}
