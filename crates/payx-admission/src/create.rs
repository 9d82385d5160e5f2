use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use sqlx::{Connection, PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use payx_aml::AmlEngine;
use payx_db::NewPayment;
use payx_gates::{enforce_kyc, IdempotencyGate, LimitsEvaluation, LimitsService, RateLimiter};
use payx_risk::{RiskContext, RiskEngine};
use payx_schemas::enums::{EventType, PaymentStatus};
use payx_schemas::events::{
    PaymentRequestedPayload, PaymentReviewRequiredPayload, REVIEW_REASON_RISK_OR_AML,
};
use payx_schemas::validation::{ensure_supported_currency, require_identifier};
use payx_schemas::{
    AdmissionError, CreatePaymentRequest, Customer, Payment, PaymentAcceptedResponse,
};

use crate::{new_trace_id, resolve_status};

const PENDING_POLL_ATTEMPTS: u32 = 5;
const PENDING_POLL_SLEEP: Duration = Duration::from_millis(20);
const ACCEPTED_STATUS_CODE: i32 = 202;

/// Raw header values as received by the edge; validated and trimmed here so
/// every caller (HTTP or test harness) gets identical normalization.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    pub merchant_id: Option<String>,
    pub customer_id: Option<String>,
    pub account_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub traceparent: Option<String>,
}

#[derive(Debug, Clone)]
struct RequestContext {
    merchant_id: String,
    customer_id: String,
    account_id: String,
    idempotency_key: String,
    traceparent: Option<String>,
}

#[derive(Debug, Clone)]
struct ControlDecision {
    risk_score: i32,
    risk_decision: payx_schemas::enums::RiskDecision,
    aml_decision: payx_schemas::enums::AmlDecision,
    final_status: PaymentStatus,
}

/// The admission coordinator. One instance per process; each `execute` is
/// one admission with its own store session and one transaction.
pub struct CreatePayment {
    pool: PgPool,
    idempotency: IdempotencyGate,
    rate_limiter: RateLimiter,
    limits: LimitsService,
    risk: RiskEngine,
    aml: AmlEngine,
    supported_currencies: HashSet<String>,
}

impl CreatePayment {
    pub fn new(
        pool: PgPool,
        idempotency: IdempotencyGate,
        rate_limiter: RateLimiter,
        limits: LimitsService,
        risk: RiskEngine,
        aml: AmlEngine,
        supported_currencies: HashSet<String>,
    ) -> Self {
        Self {
            pool,
            idempotency,
            rate_limiter,
            limits,
            risk,
            aml,
            supported_currencies,
        }
    }

    pub async fn execute(
        &self,
        headers: RequestHeaders,
        mut request: CreatePaymentRequest,
    ) -> Result<PaymentAcceptedResponse, AdmissionError> {
        let ctx = self.build_request_context(headers, &mut request)?;

        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire store session")?;

        if let Some(replayed) = self.try_replay(&mut conn, &ctx).await? {
            info!(
                merchant_id = %ctx.merchant_id,
                idempotency_key = %ctx.idempotency_key,
                "idempotent_replay"
            );
            return Ok(replayed);
        }

        if !self
            .idempotency
            .acquire(&ctx.merchant_id, &ctx.idempotency_key)
            .await
        {
            return self.resolve_pending_idempotent(&mut conn, &ctx).await;
        }

        self.create_with_controls(&mut conn, &ctx, &request).await
    }

    fn build_request_context(
        &self,
        headers: RequestHeaders,
        request: &mut CreatePaymentRequest,
    ) -> Result<RequestContext, AdmissionError> {
        if request.amount <= rust_decimal::Decimal::ZERO {
            return Err(AdmissionError::Validation(
                "Amount must be positive".to_string(),
            ));
        }
        if let Some(destination) = &request.destination {
            if destination.len() > 128 {
                return Err(AdmissionError::Validation(
                    "Destination too long".to_string(),
                ));
            }
        }
        let merchant_id = require_identifier(headers.merchant_id.as_deref(), "X-Merchant-Id")?;
        let customer_id = require_identifier(headers.customer_id.as_deref(), "X-Customer-Id")?;
        let account_id = require_identifier(headers.account_id.as_deref(), "X-Account-Id")?;
        let idempotency_key =
            require_identifier(headers.idempotency_key.as_deref(), "Idempotency-Key")?;
        request.currency = ensure_supported_currency(&request.currency, &self.supported_currencies)?;
        Ok(RequestContext {
            merchant_id,
            customer_id,
            account_id,
            idempotency_key,
            traceparent: headers.traceparent,
        })
    }

    async fn create_with_controls(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        request: &CreatePaymentRequest,
    ) -> Result<PaymentAcceptedResponse, AdmissionError> {
        let customer = self.load_customer(conn, &ctx.customer_id).await?;

        // Gate order is fixed: KYC (cheap, deterministic), limits (feeds
        // the risk context), rate limiter last so rejected requests do not
        // consume quota.
        enforce_kyc(&customer, request.method)?;
        let limits_evaluation = self
            .limits
            .enforce(conn, &ctx.customer_id, request.method, request.amount)
            .await?;
        self.rate_limiter
            .enforce(&ctx.merchant_id, &ctx.customer_id, &ctx.account_id)
            .await?;

        let decision = self
            .evaluate_controls(conn, ctx, &customer, request, &limits_evaluation)
            .await?;

        let response = PaymentAcceptedResponse {
            payment_id: Uuid::new_v4(),
            status: decision.final_status,
            trace_id: new_trace_id(),
            risk_decision: Some(decision.risk_decision),
            aml_decision: Some(decision.aml_decision),
        };

        if let Some(replayed) = self.persist(conn, ctx, request, &decision, &response).await? {
            return Ok(replayed);
        }

        self.after_commit(conn, ctx, request, &response).await;
        Ok(response)
    }

    async fn load_customer(
        &self,
        conn: &mut PgConnection,
        customer_id: &str,
    ) -> Result<Customer, AdmissionError> {
        payx_db::customers::get_by_id(conn, customer_id)
            .await
            .context("customer load failed")?
            .ok_or_else(|| AdmissionError::Validation("Customer not found".to_string()))
    }

    async fn evaluate_controls(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        customer: &Customer,
        request: &CreatePaymentRequest,
        limits_evaluation: &LimitsEvaluation,
    ) -> Result<ControlDecision, AdmissionError> {
        let now = Utc::now();
        let repeated_failures = payx_db::payments::count_failures_since(
            conn,
            &ctx.customer_id,
            now - chrono::Duration::days(1),
        )
        .await
        .context("failure count query failed")?;
        let destination_seen = payx_db::payments::destination_seen(
            conn,
            &ctx.customer_id,
            request.destination.as_deref(),
        )
        .await
        .context("destination query failed")?;

        let is_new_customer = match customer.created_at {
            Some(created_at) => now - created_at < chrono::Duration::days(7),
            None => true,
        };

        let risk_context = RiskContext {
            amount: request.amount,
            policy_max: limits_evaluation.policy.max_amount,
            velocity_count: limits_evaluation.velocity_count,
            velocity_limit: limits_evaluation.policy.velocity_limit_count as i64,
            repeated_failures,
            is_new_customer,
            customer_kyc: customer.kyc_level,
            destination_seen,
        };
        let (risk_score, risk_decision) = self.risk.evaluate(&risk_context);

        let aml_decision = self
            .aml
            .evaluate(
                conn,
                &ctx.customer_id,
                request.method,
                request.amount,
                request.destination.as_deref(),
                &limits_evaluation.policy,
            )
            .await?;

        Ok(ControlDecision {
            risk_score,
            risk_decision,
            aml_decision,
            final_status: resolve_status(risk_decision, aml_decision),
        })
    }

    /// One transaction on the admission's own session: payment + outbox
    /// event + idempotency snapshot. On a unique violation the transaction
    /// rolls back and the winner's state resolves the response; `None`
    /// means this call committed.
    async fn persist(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        request: &CreatePaymentRequest,
        decision: &ControlDecision,
        response: &PaymentAcceptedResponse,
    ) -> Result<Option<PaymentAcceptedResponse>, AdmissionError> {
        let mut tx = conn
            .begin()
            .await
            .context("failed to open admission transaction")?;

        let outcome = self
            .persist_in_tx(&mut tx, ctx, request, decision, response)
            .await;

        match outcome {
            Ok(()) => {
                tx.commit()
                    .await
                    .context("admission transaction commit failed")?;
                Ok(None)
            }
            Err(err) if payx_db::is_any_unique_violation(&err) => {
                drop(tx);
                match self.resolve_after_conflict(conn, ctx).await? {
                    Some(replayed) => Ok(Some(replayed)),
                    None => Err(AdmissionError::IdempotencyConflict),
                }
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("admission persistence failed")
                .into()),
        }
    }

    async fn persist_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ctx: &RequestContext,
        request: &CreatePaymentRequest,
        decision: &ControlDecision,
        response: &PaymentAcceptedResponse,
    ) -> Result<(), sqlx::Error> {
        payx_db::payments::insert_payment(
            &mut *tx,
            &NewPayment {
                payment_id: response.payment_id,
                merchant_id: ctx.merchant_id.clone(),
                customer_id: ctx.customer_id.clone(),
                account_id: ctx.account_id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                method: request.method,
                destination: request.destination.clone(),
                status: decision.final_status,
                idempotency_key: ctx.idempotency_key.clone(),
                risk_score: decision.risk_score,
                risk_decision: decision.risk_decision,
                aml_decision: decision.aml_decision,
                metadata: request.metadata.clone(),
            },
        )
        .await?;

        match decision.final_status {
            PaymentStatus::Received => {
                let payload = PaymentRequestedPayload {
                    payment_id: response.payment_id,
                    merchant_id: ctx.merchant_id.clone(),
                    trace_id: response.trace_id.clone(),
                    traceparent: ctx.traceparent.clone(),
                };
                payx_db::outbox::add_event(
                    &mut *tx,
                    response.payment_id,
                    EventType::PaymentRequested,
                    &serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
                )
                .await?;
            }
            PaymentStatus::InReview => {
                let payload = PaymentReviewRequiredPayload {
                    payment_id: response.payment_id,
                    merchant_id: ctx.merchant_id.clone(),
                    reason: REVIEW_REASON_RISK_OR_AML.to_string(),
                };
                payx_db::outbox::add_event(
                    &mut *tx,
                    response.payment_id,
                    EventType::PaymentReviewRequired,
                    &serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
                )
                .await?;
            }
            // BLOCKED admissions are terminal; nothing to process.
            _ => {}
        }

        payx_db::idempotency::insert_snapshot(
            &mut *tx,
            &ctx.merchant_id,
            &ctx.idempotency_key,
            response.payment_id,
            ACCEPTED_STATUS_CODE,
            &serde_json::to_value(response).unwrap_or_else(|_| json!({})),
        )
        .await?;
        Ok(())
    }

    async fn after_commit(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        request: &CreatePaymentRequest,
        response: &PaymentAcceptedResponse,
    ) {
        if response.status != PaymentStatus::Blocked {
            self.aml
                .record_outgoing(&ctx.customer_id, request.method, request.amount)
                .await;
        }

        match payx_db::payments::count_in_review(conn).await {
            Ok(queue_size) => info!(review_queue_size = queue_size, "review_queue_sampled"),
            Err(err) => warn!(error = %err, "review queue sampling failed"),
        }

        info!(
            payment_id = %response.payment_id,
            status = response.status.as_str(),
            risk_decision = response.risk_decision.map(|d| d.as_str()).unwrap_or("-"),
            aml_decision = response.aml_decision.map(|d| d.as_str()).unwrap_or("-"),
            destination = request.destination.as_deref().unwrap_or("-"),
            rail = request.method.as_str(),
            "payment_created"
        );
    }

    async fn try_replay(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
    ) -> Result<Option<PaymentAcceptedResponse>, AdmissionError> {
        let snapshot =
            payx_db::idempotency::get_snapshot(conn, &ctx.merchant_id, &ctx.idempotency_key)
                .await
                .context("idempotency snapshot read failed")?;
        let Some(snapshot) = snapshot else {
            return Ok(None);
        };
        let response: PaymentAcceptedResponse =
            serde_json::from_value(snapshot.response_payload)
                .context("stored idempotency snapshot is not a valid response")?;
        Ok(Some(response))
    }

    /// The cache denied the lock but no snapshot exists yet: another
    /// admission is in flight. Wait briefly for its commit to become
    /// visible, then give up with a conflict.
    async fn resolve_pending_idempotent(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
    ) -> Result<PaymentAcceptedResponse, AdmissionError> {
        for _ in 0..PENDING_POLL_ATTEMPTS {
            if let Some(resolved) = self.resolve_after_conflict(conn, ctx).await? {
                return Ok(resolved);
            }
            tokio::time::sleep(PENDING_POLL_SLEEP).await;
        }
        Err(AdmissionError::IdempotencyConflict)
    }

    async fn resolve_after_conflict(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
    ) -> Result<Option<PaymentAcceptedResponse>, AdmissionError> {
        if let Some(replayed) = self.try_replay(conn, ctx).await? {
            return Ok(Some(replayed));
        }
        let existing = payx_db::payments::get_by_merchant_and_idempotency(
            conn,
            &ctx.merchant_id,
            &ctx.idempotency_key,
        )
        .await
        .context("existing payment lookup failed")?;
        Ok(existing.map(response_from_existing))
    }
}

fn response_from_existing(payment: Payment) -> PaymentAcceptedResponse {
    PaymentAcceptedResponse {
        payment_id: payment.payment_id,
        status: payment.status,
        trace_id: new_trace_id(),
        risk_decision: payment.risk_decision,
        aml_decision: payment.aml_decision,
    }
}
