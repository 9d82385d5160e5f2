use serde::{Deserialize, Serialize};

/// Raised when a stored string does not map back onto an enum variant.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Payment rail / settlement channel. Each rail has its own provider
/// strategy and its own limits policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    PIX,
    BOLETO,
    TED,
    CARD,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::PIX,
        PaymentMethod::BOLETO,
        PaymentMethod::TED,
        PaymentMethod::CARD,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::PIX => "PIX",
            PaymentMethod::BOLETO => "BOLETO",
            PaymentMethod::TED => "TED",
            PaymentMethod::CARD => "CARD",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "PIX" => Ok(PaymentMethod::PIX),
            "BOLETO" => Ok(PaymentMethod::BOLETO),
            "TED" => Ok(PaymentMethod::TED),
            "CARD" => Ok(PaymentMethod::CARD),
            other => Err(EnumParseError::new("payment method", other)),
        }
    }
}

/// Payment lifecycle. Transitions form a DAG:
/// RECEIVED → PROCESSING → {CONFIRMED, FAILED};
/// IN_REVIEW → RECEIVED (approve) or BLOCKED (reject);
/// any admission decision may terminate at BLOCKED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Received,
    Validated,
    InReview,
    Processing,
    Confirmed,
    Failed,
    Blocked,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Received => "RECEIVED",
            PaymentStatus::Validated => "VALIDATED",
            PaymentStatus::InReview => "IN_REVIEW",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Confirmed => "CONFIRMED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "RECEIVED" => Ok(PaymentStatus::Received),
            "VALIDATED" => Ok(PaymentStatus::Validated),
            "IN_REVIEW" => Ok(PaymentStatus::InReview),
            "PROCESSING" => Ok(PaymentStatus::Processing),
            "CONFIRMED" => Ok(PaymentStatus::Confirmed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "BLOCKED" => Ok(PaymentStatus::Blocked),
            other => Err(EnumParseError::new("payment status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Sent => "SENT",
            OutboxStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "PENDING" => Ok(OutboxStatus::Pending),
            "SENT" => Ok(OutboxStatus::Sent),
            "FAILED" => Ok(OutboxStatus::Failed),
            other => Err(EnumParseError::new("outbox status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    PaymentRequested,
    PaymentConfirmed,
    PaymentFailed,
    PaymentReviewRequired,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PaymentRequested => "PaymentRequested",
            EventType::PaymentConfirmed => "PaymentConfirmed",
            EventType::PaymentFailed => "PaymentFailed",
            EventType::PaymentReviewRequired => "PaymentReviewRequired",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "PaymentRequested" => Ok(EventType::PaymentRequested),
            "PaymentConfirmed" => Ok(EventType::PaymentConfirmed),
            "PaymentFailed" => Ok(EventType::PaymentFailed),
            "PaymentReviewRequired" => Ok(EventType::PaymentReviewRequired),
            other => Err(EnumParseError::new("event type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitDimension {
    Merchant,
    Customer,
    Account,
}

impl RateLimitDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitDimension::Merchant => "merchant",
            RateLimitDimension::Customer => "customer",
            RateLimitDimension::Account => "account",
        }
    }
}

/// KYC verification tier. Ordering matters: NONE < BASIC < FULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycLevel {
    None,
    Basic,
    Full,
}

impl KycLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycLevel::None => "NONE",
            KycLevel::Basic => "BASIC",
            KycLevel::Full => "FULL",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "NONE" => Ok(KycLevel::None),
            "BASIC" => Ok(KycLevel::Basic),
            "FULL" => Ok(KycLevel::Full),
            other => Err(EnumParseError::new("kyc level", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Suspended,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Suspended => "SUSPENDED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "ACTIVE" => Ok(CustomerStatus::Active),
            "SUSPENDED" => Ok(CustomerStatus::Suspended),
            other => Err(EnumParseError::new("customer status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDecision {
    Allow,
    Review,
    Block,
}

impl RiskDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskDecision::Allow => "ALLOW",
            RiskDecision::Review => "REVIEW",
            RiskDecision::Block => "BLOCK",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "ALLOW" => Ok(RiskDecision::Allow),
            "REVIEW" => Ok(RiskDecision::Review),
            "BLOCK" => Ok(RiskDecision::Block),
            other => Err(EnumParseError::new("risk decision", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmlDecision {
    Allow,
    Review,
    Block,
}

impl AmlDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmlDecision::Allow => "ALLOW",
            AmlDecision::Review => "REVIEW",
            AmlDecision::Block => "BLOCK",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "ALLOW" => Ok(AmlDecision::Allow),
            "REVIEW" => Ok(AmlDecision::Review),
            "BLOCK" => Ok(AmlDecision::Block),
            other => Err(EnumParseError::new("aml decision", other)),
        }
    }
}

/// Canonical `last_error` values written by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ManualReviewRejected,
    ProviderPartialFailure,
    Unexpected,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ManualReviewRejected => "manual_review_rejected",
            FailureReason::ProviderPartialFailure => "provider_partial_failure",
            FailureReason::Unexpected => "unexpected",
        }
    }
}

/// Surface error categories as exposed in the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ValidationError,
    ProviderTimeout,
    Provider5xx,
    ConcurrencyConflict,
    IdempotencyConflict,
    KycDenied,
    LimitExceeded,
    RateLimited,
    AmlBlocked,
    RiskBlocked,
    Unexpected,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ValidationError => "validation_error",
            ErrorCategory::ProviderTimeout => "provider_timeout",
            ErrorCategory::Provider5xx => "provider_5xx",
            ErrorCategory::ConcurrencyConflict => "concurrency_conflict",
            ErrorCategory::IdempotencyConflict => "idempotency_conflict",
            ErrorCategory::KycDenied => "kyc_denied",
            ErrorCategory::LimitExceeded => "limit_exceeded",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::AmlBlocked => "aml_blocked",
            ErrorCategory::RiskBlocked => "risk_blocked",
            ErrorCategory::Unexpected => "unexpected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_roundtrips_through_strings() {
        for s in [
            PaymentStatus::Received,
            PaymentStatus::Validated,
            PaymentStatus::InReview,
            PaymentStatus::Processing,
            PaymentStatus::Confirmed,
            PaymentStatus::Failed,
            PaymentStatus::Blocked,
        ] {
            assert_eq!(PaymentStatus::parse(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = PaymentStatus::parse("SETTLED").unwrap_err();
        assert!(err.to_string().contains("SETTLED"));
    }

    #[test]
    fn event_type_wire_names_are_camel_case() {
        assert_eq!(EventType::PaymentRequested.as_str(), "PaymentRequested");
        assert_eq!(
            serde_json::to_string(&EventType::PaymentReviewRequired).unwrap(),
            "\"PaymentReviewRequired\""
        );
    }

    #[test]
    fn payment_status_serde_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::InReview).unwrap(),
            "\"IN_REVIEW\""
        );
        let parsed: PaymentStatus = serde_json::from_str("\"RECEIVED\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Received);
    }

    #[test]
    fn rate_limit_dimension_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&RateLimitDimension::Merchant).unwrap(),
            "\"merchant\""
        );
    }
}
