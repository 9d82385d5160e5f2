use serde_json::json;
use sqlx::PgConnection;

use payx_schemas::enums::EventType;
use payx_schemas::events::{PaymentConfirmedPayload, PaymentFailedPayload};
use payx_schemas::Payment;

/// CONFIRMED + PaymentConfirmed event, same transaction as the caller's
/// work item. Version lands at observed + 2 (the claim took + 1).
pub async fn confirm(
    conn: &mut PgConnection,
    payment: &Payment,
    provider: &str,
    provider_reference: &str,
) -> Result<(), sqlx::Error> {
    payx_db::payments::mark_confirmed(conn, payment.payment_id, payment.version).await?;
    let payload = PaymentConfirmedPayload {
        payment_id: payment.payment_id,
        merchant_id: payment.merchant_id.clone(),
        provider: provider.to_string(),
        provider_reference: provider_reference.to_string(),
    };
    payx_db::outbox::add_event(
        conn,
        payment.payment_id,
        EventType::PaymentConfirmed,
        &serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
    )
    .await?;
    Ok(())
}

/// FAILED with the reason in `last_error` + PaymentFailed event.
pub async fn fail(
    conn: &mut PgConnection,
    payment: &Payment,
    provider: &str,
    category: &str,
    reason: &str,
) -> Result<(), sqlx::Error> {
    payx_db::payments::mark_failed(conn, payment.payment_id, payment.version, reason).await?;
    let payload = PaymentFailedPayload {
        payment_id: payment.payment_id,
        merchant_id: payment.merchant_id.clone(),
        provider: provider.to_string(),
        error_category: category.to_string(),
        reason: reason.to_string(),
    };
    payx_db::outbox::add_event(
        conn,
        payment.payment_id,
        EventType::PaymentFailed,
        &serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
    )
    .await?;
    Ok(())
}
