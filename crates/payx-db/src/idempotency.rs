use serde_json::Value;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use payx_schemas::IdempotencyRecord;

pub async fn get_snapshot(
    conn: &mut PgConnection,
    merchant_id: &str,
    idempotency_key: &str,
) -> Result<Option<IdempotencyRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        select merchant_id, idempotency_key, payment_id, status_code,
               response_payload, created_at
          from idempotency_records
         where merchant_id = $1
           and idempotency_key = $2
        "#,
    )
    .bind(merchant_id)
    .bind(idempotency_key)
    .fetch_optional(conn)
    .await?;

    let Some(row) = row else { return Ok(None) };

    Ok(Some(IdempotencyRecord {
        merchant_id: row.try_get("merchant_id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        payment_id: row.try_get("payment_id")?,
        status_code: row.try_get("status_code")?,
        response_payload: row.try_get("response_payload")?,
        created_at: row.try_get("created_at")?,
    }))
}

/// Freeze the response served for the first accepted request. Runs inside
/// the admission transaction; the `(merchant_id, idempotency_key)` unique
/// constraint is the authoritative duplicate check.
pub async fn insert_snapshot(
    conn: &mut PgConnection,
    merchant_id: &str,
    idempotency_key: &str,
    payment_id: Uuid,
    status_code: i32,
    response_payload: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into idempotency_records (
          merchant_id, idempotency_key, payment_id, status_code, response_payload
        ) values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(merchant_id)
    .bind(idempotency_key)
    .bind(payment_id)
    .bind(status_code)
    .bind(response_payload)
    .execute(conn)
    .await?;
    Ok(())
}
