//! Shared domain contracts for the payments pipeline.
//!
//! Everything that crosses a crate boundary lives here: enums, entities,
//! outbox payloads, request/response DTOs, the rail profile table and the
//! error taxonomy. No I/O.

pub mod dto;
pub mod entities;
pub mod enums;
pub mod error;
pub mod events;
pub mod money;
pub mod rails;
pub mod validation;

pub use dto::{
    CreatePaymentRequest, PaymentAcceptedResponse, PaymentStatusResponse, ProviderRequest,
    ProviderResponse,
};
pub use entities::{Customer, IdempotencyRecord, LimitsPolicy, OutboxEvent, Payment};
pub use enums::{
    AmlDecision, CustomerStatus, ErrorCategory, EventType, FailureReason, KycLevel, OutboxStatus,
    PaymentMethod, PaymentStatus, RateLimitDimension, RiskDecision,
};
pub use error::AdmissionError;
pub use events::{
    DomainEvent, PaymentConfirmedPayload, PaymentFailedPayload, PaymentRequestedPayload,
    PaymentReviewRequiredPayload, REVIEW_REASON_RISK_OR_AML,
};
pub use money::{cents_to_decimal, decimal_to_cents};
pub use rails::{kyc_rank, minimum_kyc_level_for, rail_profile, RailProfile};
