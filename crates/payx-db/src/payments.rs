use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use payx_schemas::enums::{AmlDecision, PaymentMethod, PaymentStatus, RiskDecision};
use payx_schemas::Payment;

use crate::decode_err;

/// Structured create argument for the admission transaction. `created_at`,
/// `updated_at` and `version` come from column defaults.
#[derive(Debug, Clone)]
pub struct NewPayment {
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
    pub risk_score: i32,
    pub risk_decision: RiskDecision,
    pub aml_decision: AmlDecision,
    pub metadata: Option<Value>,
}

const PAYMENT_COLUMNS: &str = r#"
    payment_id, merchant_id, customer_id, account_id, amount, currency,
    method, destination, status, idempotency_key, risk_score, risk_decision,
    aml_decision, metadata, last_error, created_at, updated_at, version
"#;

fn row_to_payment(row: &sqlx::postgres::PgRow) -> Result<Payment, sqlx::Error> {
    let method: String = row.try_get("method")?;
    let status: String = row.try_get("status")?;
    let risk_decision: Option<String> = row.try_get("risk_decision")?;
    let aml_decision: Option<String> = row.try_get("aml_decision")?;

    Ok(Payment {
        payment_id: row.try_get("payment_id")?,
        merchant_id: row.try_get("merchant_id")?,
        customer_id: row.try_get("customer_id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        method: PaymentMethod::parse(&method).map_err(decode_err)?,
        destination: row.try_get("destination")?,
        status: PaymentStatus::parse(&status).map_err(decode_err)?,
        idempotency_key: row.try_get("idempotency_key")?,
        risk_score: row.try_get("risk_score")?,
        risk_decision: risk_decision
            .as_deref()
            .map(RiskDecision::parse)
            .transpose()
            .map_err(decode_err)?,
        aml_decision: aml_decision
            .as_deref()
            .map(AmlDecision::parse)
            .transpose()
            .map_err(decode_err)?,
        metadata: row.try_get("metadata")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

pub async fn get_by_id(
    conn: &mut PgConnection,
    payment_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "select {PAYMENT_COLUMNS} from payments where payment_id = $1"
    ))
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(row_to_payment).transpose()
}

pub async fn get_by_merchant_and_idempotency(
    conn: &mut PgConnection,
    merchant_id: &str,
    idempotency_key: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "select {PAYMENT_COLUMNS} from payments where merchant_id = $1 and idempotency_key = $2"
    ))
    .bind(merchant_id)
    .bind(idempotency_key)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(row_to_payment).transpose()
}

/// Insert the aggregate. Surfaces the raw sqlx error so callers can detect
/// the `(merchant_id, idempotency_key)` unique violation and recover.
pub async fn insert_payment(
    conn: &mut PgConnection,
    payment: &NewPayment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into payments (
          payment_id, merchant_id, customer_id, account_id, amount, currency,
          method, destination, status, idempotency_key, risk_score,
          risk_decision, aml_decision, metadata
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
        )
        "#,
    )
    .bind(payment.payment_id)
    .bind(&payment.merchant_id)
    .bind(&payment.customer_id)
    .bind(&payment.account_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.method.as_str())
    .bind(&payment.destination)
    .bind(payment.status.as_str())
    .bind(&payment.idempotency_key)
    .bind(payment.risk_score)
    .bind(payment.risk_decision.as_str())
    .bind(payment.aml_decision.as_str())
    .bind(&payment.metadata)
    .execute(conn)
    .await?;
    Ok(())
}

/// Unconditional status update used by the review workflow. Bumps the
/// version so every state change stays observable to optimistic readers.
pub async fn update_status(
    conn: &mut PgConnection,
    payment_id: Uuid,
    status: PaymentStatus,
    last_error: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        update payments
           set status = $2,
               last_error = $3,
               version = version + 1,
               updated_at = now()
         where payment_id = $1
        "#,
    )
    .bind(payment_id)
    .bind(status.as_str())
    .bind(last_error)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Optimistic claim guarded on the observed version. Exactly one
/// concurrent worker sees `true`; everyone else lost the race and must not
/// mutate anything. PROCESSING stays claimable so a rescheduled event can
/// re-drive its own payment; review and terminal statuses behave like a
/// lost race.
pub async fn mark_processing(
    conn: &mut PgConnection,
    payment_id: Uuid,
    observed_version: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        update payments
           set status = $3,
               version = version + 1,
               updated_at = now()
         where payment_id = $1
           and version = $2
           and status in ($4, $5)
        "#,
    )
    .bind(payment_id)
    .bind(observed_version)
    .bind(PaymentStatus::Processing.as_str())
    .bind(PaymentStatus::Received.as_str())
    .bind(PaymentStatus::Processing.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Finalize as CONFIRMED. `observed_version` is the version read before the
/// claim; the claim bumped it once, finalization lands at observed + 2.
pub async fn mark_confirmed(
    conn: &mut PgConnection,
    payment_id: Uuid,
    observed_version: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        update payments
           set status = $3,
               version = $2 + 2,
               last_error = null,
               updated_at = now()
         where payment_id = $1
        "#,
    )
    .bind(payment_id)
    .bind(observed_version)
    .bind(PaymentStatus::Confirmed.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Finalize as FAILED with the reason recorded in `last_error`.
pub async fn mark_failed(
    conn: &mut PgConnection,
    payment_id: Uuid,
    observed_version: i32,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        update payments
           set status = $3,
               version = $2 + 2,
               last_error = $4,
               updated_at = now()
         where payment_id = $1
        "#,
    )
    .bind(payment_id)
    .bind(observed_version)
    .bind(PaymentStatus::Failed.as_str())
    .bind(reason)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Sum of non-BLOCKED outgoing amounts for a customer+rail since `since`.
/// Authoritative fallback for the daily-limit and AML aggregate checks.
pub async fn sum_outgoing_since(
    conn: &mut PgConnection,
    customer_id: &str,
    rail: PaymentMethod,
    since: DateTime<Utc>,
) -> Result<Decimal, sqlx::Error> {
    let (total,): (Decimal,) = sqlx::query_as(
        r#"
        select coalesce(sum(amount), 0)
          from payments
         where customer_id = $1
           and method = $2
           and created_at >= $3
           and status <> $4
        "#,
    )
    .bind(customer_id)
    .bind(rail.as_str())
    .bind(since)
    .bind(PaymentStatus::Blocked.as_str())
    .fetch_one(conn)
    .await?;
    Ok(total)
}

pub async fn count_outgoing_since(
    conn: &mut PgConnection,
    customer_id: &str,
    rail: PaymentMethod,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint
          from payments
         where customer_id = $1
           and method = $2
           and created_at >= $3
           and status <> $4
        "#,
    )
    .bind(customer_id)
    .bind(rail.as_str())
    .bind(since)
    .bind(PaymentStatus::Blocked.as_str())
    .fetch_one(conn)
    .await?;
    Ok(count)
}

pub async fn count_failures_since(
    conn: &mut PgConnection,
    customer_id: &str,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint
          from payments
         where customer_id = $1
           and status = $2
           and created_at >= $3
        "#,
    )
    .bind(customer_id)
    .bind(PaymentStatus::Failed.as_str())
    .bind(since)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Whether this customer has ever paid this destination before.
pub async fn destination_seen(
    conn: &mut PgConnection,
    customer_id: &str,
    destination: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let Some(destination) = destination else {
        return Ok(false);
    };
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        select payment_id
          from payments
         where customer_id = $1
           and destination = $2
         limit 1
        "#,
    )
    .bind(customer_id)
    .bind(destination)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

/// Count of non-BLOCKED payments in the structuring band
/// `[low_amount, high_amount]` since `since`.
pub async fn count_near_threshold_since(
    conn: &mut PgConnection,
    customer_id: &str,
    rail: PaymentMethod,
    since: DateTime<Utc>,
    low_amount: Decimal,
    high_amount: Decimal,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint
          from payments
         where customer_id = $1
           and method = $2
           and created_at >= $3
           and amount >= $4
           and amount <= $5
           and status <> $6
        "#,
    )
    .bind(customer_id)
    .bind(rail.as_str())
    .bind(since)
    .bind(low_amount)
    .bind(high_amount)
    .bind(PaymentStatus::Blocked.as_str())
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Review backlog gauge sampled after admissions and review transitions.
pub async fn count_in_review(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "select count(*)::bigint from payments where status = $1",
    )
    .bind(PaymentStatus::InReview.as_str())
    .fetch_one(conn)
    .await?;
    Ok(count)
}
