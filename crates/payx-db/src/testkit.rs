//! Test support for Postgres-backed scenarios.
//!
//! Schema ownership lives with the deployment pipeline; this bootstrap
//! exists only so `#[ignore]`-gated scenario tests can run against a scratch
//! database. It mirrors the production shape, including the corrected
//! NOT-NULL-no-default `limits_policies.rail`.

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;

use payx_schemas::enums::{CustomerStatus, KycLevel, PaymentMethod};
use payx_schemas::LimitsPolicy;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    create table if not exists customers (
      customer_id varchar(128) primary key,
      kyc_level   text not null default 'NONE',
      status      text not null default 'ACTIVE',
      created_at  timestamptz not null default now()
    )
    "#,
    r#"
    create table if not exists limits_policies (
      rail                    text primary key,
      min_amount              numeric(18,2) not null,
      max_amount              numeric(18,2) not null,
      daily_limit_amount      numeric(18,2) not null,
      velocity_limit_count    integer not null,
      velocity_window_seconds bigint not null
    )
    "#,
    r#"
    create table if not exists payments (
      payment_id      uuid primary key,
      merchant_id     varchar(128) not null,
      customer_id     varchar(128) not null references customers(customer_id),
      account_id      varchar(128) not null,
      amount          numeric(18,2) not null,
      currency        varchar(3) not null,
      method          text not null,
      destination     varchar(128),
      status          text not null default 'RECEIVED',
      idempotency_key varchar(128) not null,
      risk_score      integer,
      risk_decision   text,
      aml_decision    text,
      metadata        jsonb,
      last_error      varchar(512),
      created_at      timestamptz not null default now(),
      updated_at      timestamptz not null default now(),
      version         integer not null default 1,
      constraint uq_payment_merchant_idempotency unique (merchant_id, idempotency_key)
    )
    "#,
    r#"
    create index if not exists ix_payments_customer_method_created_status
      on payments (customer_id, method, created_at, status)
    "#,
    r#"
    create table if not exists outbox_events (
      event_id        uuid primary key,
      aggregate_id    uuid not null,
      event_type      text not null,
      payload         jsonb not null,
      status          text not null default 'PENDING',
      attempts        integer not null default 0,
      created_at      timestamptz not null default now(),
      next_attempt_at timestamptz not null default now()
    )
    "#,
    r#"
    create index if not exists ix_outbox_status_type_next_attempt
      on outbox_events (status, event_type, next_attempt_at)
    "#,
    r#"
    create index if not exists ix_outbox_aggregate on outbox_events (aggregate_id)
    "#,
    r#"
    create table if not exists idempotency_records (
      id               bigserial primary key,
      merchant_id      varchar(128) not null,
      idempotency_key  varchar(128) not null,
      payment_id       uuid not null,
      status_code      integer not null,
      response_payload jsonb not null,
      created_at       timestamptz not null default now(),
      constraint uq_idempotency_scope unique (merchant_id, idempotency_key)
    )
    "#,
];

/// Connect via PAYX_DATABASE_URL and make sure the scratch schema exists.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = crate::connect_from_env().await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Wipe all pipeline tables between scenarios.
pub async fn truncate_all(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "truncate idempotency_records, outbox_events, payments, limits_policies, customers",
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_customer(
    pool: &PgPool,
    customer_id: &str,
    kyc_level: KycLevel,
    status: CustomerStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into customers (customer_id, kyc_level, status)
        values ($1, $2, $3)
        on conflict (customer_id) do update
            set kyc_level = excluded.kyc_level,
                status = excluded.status
        "#,
    )
    .bind(customer_id)
    .bind(kyc_level.as_str())
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_policy(pool: &PgPool, policy: &LimitsPolicy) -> Result<()> {
    sqlx::query(
        r#"
        insert into limits_policies (
          rail, min_amount, max_amount, daily_limit_amount,
          velocity_limit_count, velocity_window_seconds
        ) values ($1, $2, $3, $4, $5, $6)
        on conflict (rail) do update
            set min_amount = excluded.min_amount,
                max_amount = excluded.max_amount,
                daily_limit_amount = excluded.daily_limit_amount,
                velocity_limit_count = excluded.velocity_limit_count,
                velocity_window_seconds = excluded.velocity_window_seconds
        "#,
    )
    .bind(policy.rail.as_str())
    .bind(policy.min_amount)
    .bind(policy.max_amount)
    .bind(policy.daily_limit_amount)
    .bind(policy.velocity_limit_count)
    .bind(policy.velocity_window_seconds)
    .execute(pool)
    .await?;
    Ok(())
}

/// A permissive PIX policy most scenarios start from.
pub fn default_pix_policy() -> LimitsPolicy {
    LimitsPolicy {
        rail: PaymentMethod::PIX,
        min_amount: Decimal::new(1, 2),
        max_amount: Decimal::new(10_000_00, 2),
        daily_limit_amount: Decimal::new(50_000_00, 2),
        velocity_limit_count: 100,
        velocity_window_seconds: 60,
    }
}
