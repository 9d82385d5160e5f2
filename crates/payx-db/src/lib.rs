//! Postgres access for the payments pipeline.
//!
//! Repositories are free async functions over `&mut PgConnection` so the
//! caller decides the transaction scope: one admission is one transaction,
//! one outbox event is one transaction. Nothing in here commits on its own.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod customers;
pub mod idempotency;
pub mod limits;
pub mod outbox;
pub mod payments;

#[cfg(feature = "testkit")]
pub mod testkit;

pub use payments::NewPayment;

pub const ENV_DB_URL: &str = "PAYX_DATABASE_URL";

/// Named unique constraints the pipeline recovers from.
pub const UQ_PAYMENT_MERCHANT_IDEMPOTENCY: &str = "uq_payment_merchant_idempotency";
pub const UQ_IDEMPOTENCY_SCOPE: &str = "uq_idempotency_scope";

/// Connect to Postgres using PAYX_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Detect a Postgres unique constraint violation by name.
pub fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.constraint() == Some(constraint)
                || (db_err.code().as_deref() == Some("23505")
                    && db_err.constraint() == Some(constraint))
        }
        _ => false,
    }
}

/// Any unique violation, regardless of constraint name. Admission recovery
/// treats the payments constraint and the idempotency constraint the same
/// way: rollback, then resolve from whichever row won.
pub fn is_any_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

pub(crate) fn decode_err(
    err: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
