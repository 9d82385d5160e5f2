use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use payx_schemas::{AdmissionError, PaymentStatusResponse};

/// Full payment projection for GET /payments/{id}: every aggregate field
/// except metadata internals.
pub async fn get_payment_status(
    pool: &PgPool,
    payment_id: Uuid,
) -> Result<PaymentStatusResponse, AdmissionError> {
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire store session")?;
    let payment = payx_db::payments::get_by_id(&mut conn, payment_id)
        .await
        .context("payment load failed")?
        .ok_or_else(|| AdmissionError::Validation("Payment not found".to_string()))?;

    Ok(PaymentStatusResponse {
        payment_id: payment.payment_id,
        merchant_id: payment.merchant_id,
        customer_id: payment.customer_id,
        account_id: payment.account_id,
        amount: payment.amount,
        currency: payment.currency,
        method: payment.method,
        status: payment.status,
        idempotency_key: payment.idempotency_key,
        risk_score: payment.risk_score,
        risk_decision: payment.risk_decision,
        aml_decision: payment.aml_decision,
        created_at: payment.created_at,
        updated_at: payment.updated_at,
        last_error: payment.last_error,
    })
}
