use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use payx_schemas::enums::{EventType, OutboxStatus};
use payx_schemas::OutboxEvent;

use crate::decode_err;

const EVENT_COLUMNS: &str = r#"
    event_id, aggregate_id, event_type, payload, status, attempts,
    created_at, next_attempt_at
"#;

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<OutboxEvent, sqlx::Error> {
    let event_type: String = row.try_get("event_type")?;
    let status: String = row.try_get("status")?;
    Ok(OutboxEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: EventType::parse(&event_type).map_err(decode_err)?,
        payload: row.try_get("payload")?,
        status: OutboxStatus::parse(&status).map_err(decode_err)?,
        attempts: row.try_get("attempts")?,
        created_at: row.try_get("created_at")?,
        next_attempt_at: row.try_get("next_attempt_at")?,
    })
}

/// Append a PENDING event in the caller's transaction. Returns the
/// generated event id.
pub async fn add_event(
    conn: &mut PgConnection,
    aggregate_id: Uuid,
    event_type: EventType,
    payload: &Value,
) -> Result<Uuid, sqlx::Error> {
    let event_id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into outbox_events (event_id, aggregate_id, event_type, payload, status)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(event_id)
    .bind(aggregate_id)
    .bind(event_type.as_str())
    .bind(payload)
    .bind(OutboxStatus::Pending.as_str())
    .execute(conn)
    .await?;
    Ok(event_id)
}

/// Due PENDING PaymentRequested events, oldest first.
pub async fn fetch_pending_requested(
    conn: &mut PgConnection,
    limit: i64,
) -> Result<Vec<OutboxEvent>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        select {EVENT_COLUMNS}
          from outbox_events
         where event_type = $1
           and status = $2
           and next_attempt_at <= now()
         order by created_at asc
         limit $3
        "#
    ))
    .bind(EventType::PaymentRequested.as_str())
    .bind(OutboxStatus::Pending.as_str())
    .bind(limit)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_event).collect()
}

pub async fn mark_sent(conn: &mut PgConnection, event_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("update outbox_events set status = $2 where event_id = $1")
        .bind(event_id)
        .bind(OutboxStatus::Sent.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_failed(
    conn: &mut PgConnection,
    event_id: Uuid,
    attempts: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("update outbox_events set status = $2, attempts = $3 where event_id = $1")
        .bind(event_id)
        .bind(OutboxStatus::Failed.as_str())
        .bind(attempts)
        .execute(conn)
        .await?;
    Ok(())
}

/// Push the event back into the queue with an updated attempt counter and a
/// future due time.
pub async fn reschedule(
    conn: &mut PgConnection,
    event_id: Uuid,
    attempts: i32,
    next_attempt_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "update outbox_events set attempts = $2, next_attempt_at = $3 where event_id = $1",
    )
    .bind(event_id)
    .bind(attempts)
    .bind(next_attempt_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get_by_id(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> Result<Option<OutboxEvent>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "select {EVENT_COLUMNS} from outbox_events where event_id = $1"
    ))
    .bind(event_id)
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(row_to_event).transpose()
}

/// All events for one payment, insertion order. Used by the review flow
/// tests and by operators tracing an aggregate.
pub async fn list_for_aggregate(
    conn: &mut PgConnection,
    aggregate_id: Uuid,
) -> Result<Vec<OutboxEvent>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        select {EVENT_COLUMNS}
          from outbox_events
         where aggregate_id = $1
         order by created_at asc
        "#
    ))
    .bind(aggregate_id)
    .fetch_all(conn)
    .await?;
    rows.iter().map(row_to_event).collect()
}

/// PENDING PaymentRequested backlog gauge.
pub async fn backlog_size(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint
          from outbox_events
         where status = $1
           and event_type = $2
        "#,
    )
    .bind(OutboxStatus::Pending.as_str())
    .bind(EventType::PaymentRequested.as_str())
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Age of the oldest PENDING PaymentRequested event, zero when drained.
pub async fn oldest_pending_lag_seconds(conn: &mut PgConnection) -> Result<f64, sqlx::Error> {
    let (oldest,): (Option<DateTime<Utc>>,) = sqlx::query_as(
        r#"
        select min(created_at)
          from outbox_events
         where status = $1
           and event_type = $2
        "#,
    )
    .bind(OutboxStatus::Pending.as_str())
    .bind(EventType::PaymentRequested.as_str())
    .fetch_one(conn)
    .await?;

    Ok(match oldest {
        Some(oldest) => (Utc::now() - oldest).num_milliseconds().max(0) as f64 / 1000.0,
        None => 0.0,
    })
}
