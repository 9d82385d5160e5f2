use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use payx_schemas::enums::{EventType, FailureReason, PaymentStatus};
use payx_schemas::events::PaymentRequestedPayload;
use payx_schemas::{AdmissionError, Payment, PaymentAcceptedResponse};

use crate::new_trace_id;

/// Manual approve/reject transitions for payments parked IN_REVIEW.
pub struct ReviewWorkflow {
    pool: PgPool,
}

impl ReviewWorkflow {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// IN_REVIEW → RECEIVED, re-entering the pipeline through a fresh
    /// PaymentRequested outbox event in the same transaction.
    pub async fn approve(&self, payment_id: Uuid) -> Result<PaymentAcceptedResponse, AdmissionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to open review transaction")?;

        let payment = load_review_payment(&mut tx, payment_id).await?;

        payx_db::payments::update_status(&mut tx, payment_id, PaymentStatus::Received, None)
            .await
            .context("approve status update failed")?;

        let trace_id = new_trace_id();
        let payload = PaymentRequestedPayload {
            payment_id,
            merchant_id: payment.merchant_id.clone(),
            trace_id: trace_id.clone(),
            traceparent: None,
        };
        payx_db::outbox::add_event(
            &mut tx,
            payment_id,
            EventType::PaymentRequested,
            &serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
        )
        .await
        .context("approve outbox enqueue failed")?;

        tx.commit().await.context("approve commit failed")?;

        self.sample_review_queue().await;
        info!(payment_id = %payment_id, "review_approved");
        Ok(review_response(payment_id, PaymentStatus::Received, trace_id, &payment))
    }

    /// IN_REVIEW → BLOCKED. Terminal; no outbox event is emitted.
    pub async fn reject(&self, payment_id: Uuid) -> Result<PaymentAcceptedResponse, AdmissionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to open review transaction")?;

        let payment = load_review_payment(&mut tx, payment_id).await?;

        payx_db::payments::update_status(
            &mut tx,
            payment_id,
            PaymentStatus::Blocked,
            Some(FailureReason::ManualReviewRejected.as_str()),
        )
        .await
        .context("reject status update failed")?;

        tx.commit().await.context("reject commit failed")?;

        self.sample_review_queue().await;
        info!(payment_id = %payment_id, "review_rejected");
        Ok(review_response(payment_id, PaymentStatus::Blocked, new_trace_id(), &payment))
    }

    async fn sample_review_queue(&self) {
        match self.pool.acquire().await {
            Ok(mut conn) => match payx_db::payments::count_in_review(&mut conn).await {
                Ok(queue_size) => info!(review_queue_size = queue_size, "review_queue_sampled"),
                Err(err) => warn!(error = %err, "review queue sampling failed"),
            },
            Err(err) => warn!(error = %err, "review queue sampling failed"),
        }
    }
}

async fn load_review_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment_id: Uuid,
) -> Result<Payment, AdmissionError> {
    let payment = payx_db::payments::get_by_id(&mut *tx, payment_id)
        .await
        .context("payment load failed")?
        .ok_or_else(|| AdmissionError::Validation("Payment not found".to_string()))?;
    if payment.status != PaymentStatus::InReview {
        return Err(AdmissionError::Validation(
            "Payment is not in review".to_string(),
        ));
    }
    Ok(payment)
}

fn review_response(
    payment_id: Uuid,
    status: PaymentStatus,
    trace_id: String,
    payment: &Payment,
) -> PaymentAcceptedResponse {
    PaymentAcceptedResponse {
        payment_id,
        status,
        trace_id,
        risk_decision: payment.risk_decision,
        aml_decision: payment.aml_decision,
    }
}
