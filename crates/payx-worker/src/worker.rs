use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use payx_provider::{strategy_for, ProviderApi, ProviderDriver, ProviderError};
use payx_resilience::exp_backoff;
use payx_schemas::enums::FailureReason;
use payx_schemas::OutboxEvent;

use crate::finalize;

/// Event reschedule backoff: base 0.5s, cap 5s, jitter ±25%.
const EVENT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const EVENT_BACKOFF_CAP: Duration = Duration::from_secs(5);
const EVENT_BACKOFF_JITTER: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_event_attempts: i32,
}

/// Poll-based outbox drainer. Multiple workers can run against the same
/// store; the optimistic claim keeps them from double-driving a payment.
pub struct OutboxWorker<P> {
    pool: PgPool,
    driver: Arc<ProviderDriver<P>>,
    settings: WorkerSettings,
}

impl<P: ProviderApi> OutboxWorker<P> {
    pub fn new(pool: PgPool, driver: Arc<ProviderDriver<P>>, settings: WorkerSettings) -> Self {
        Self {
            pool,
            driver,
            settings,
        }
    }

    /// Run until the shutdown channel flips to true. Per-iteration failures
    /// are logged and swallowed; the loop must never die on a transient
    /// fault.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("outbox worker started");
        loop {
            if let Err(err) = self.run_once().await {
                error!(error = ?err, "worker_iteration_failed");
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
        info!("outbox worker stopped");
    }

    /// One polling iteration: sample backlog metrics, fetch due events,
    /// process each in its own transaction. Returns the number of events
    /// picked up.
    pub async fn run_once(&self) -> Result<usize> {
        let events = {
            let mut conn = self
                .pool
                .acquire()
                .await
                .context("failed to acquire store session")?;
            let backlog = payx_db::outbox::backlog_size(&mut conn).await?;
            let lag_seconds = payx_db::outbox::oldest_pending_lag_seconds(&mut conn).await?;
            debug!(backlog, lag_seconds, "outbox_sampled");

            payx_db::outbox::fetch_pending_requested(&mut conn, self.settings.batch_size).await?
        };

        let picked_up = events.len();
        for event in events {
            self.process_event(event).await?;
        }
        Ok(picked_up)
    }

    async fn process_event(&self, event: OutboxEvent) -> Result<()> {
        let trace_id = event
            .payload
            .get("trace_id")
            .and_then(|v| v.as_str())
            .unwrap_or("-")
            .to_string();
        let traceparent = event
            .payload
            .get("traceparent")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to open event transaction")?;

        let payment = payx_db::payments::get_by_id(&mut tx, event.aggregate_id).await?;
        let Some(payment) = payment else {
            warn!(
                event_id = %event.event_id,
                aggregate_id = %event.aggregate_id,
                trace_id = %trace_id,
                "payment missing for outbox event"
            );
            payx_db::outbox::mark_failed(&mut tx, event.event_id, event.attempts + 1).await?;
            tx.commit().await.context("commit failed")?;
            return Ok(());
        };

        let claimed =
            payx_db::payments::mark_processing(&mut tx, payment.payment_id, payment.version)
                .await?;
        if !claimed {
            // Another worker owns it, or the payment moved to a
            // non-claimable status. Nothing to do for this event.
            payx_db::outbox::mark_sent(&mut tx, event.event_id).await?;
            tx.commit().await.context("commit failed")?;
            return Ok(());
        }

        match self.driver.execute(&payment, traceparent.as_deref()).await {
            Ok(response) => {
                if response.confirmed && !response.partial_failure {
                    finalize::confirm(
                        &mut tx,
                        &payment,
                        &response.provider,
                        &response.provider_reference,
                    )
                    .await?;
                    info!(
                        payment_id = %payment.payment_id,
                        provider = %response.provider,
                        trace_id = %trace_id,
                        "payment_confirmed"
                    );
                } else {
                    finalize::fail(
                        &mut tx,
                        &payment,
                        &response.provider,
                        FailureReason::ProviderPartialFailure.as_str(),
                        "Partial failure",
                    )
                    .await?;
                    warn!(
                        payment_id = %payment.payment_id,
                        provider = %response.provider,
                        trace_id = %trace_id,
                        "payment_failed_partial"
                    );
                }
                payx_db::outbox::mark_sent(&mut tx, event.event_id).await?;
            }
            Err(err) if err.is_classified() => {
                self.handle_classified_error(&mut tx, &event, &payment, &err)
                    .await?;
            }
            Err(err) => {
                error!(
                    payment_id = %payment.payment_id,
                    error = %err,
                    trace_id = %trace_id,
                    "unexpected_processor_error"
                );
                finalize::fail(
                    &mut tx,
                    &payment,
                    "unknown",
                    FailureReason::Unexpected.as_str(),
                    "Unexpected processor failure",
                )
                .await?;
                payx_db::outbox::mark_failed(&mut tx, event.event_id, event.attempts + 1).await?;
            }
        }

        tx.commit().await.context("commit failed")?;
        Ok(())
    }

    async fn handle_classified_error(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: &OutboxEvent,
        payment: &payx_schemas::Payment,
        err: &ProviderError,
    ) -> Result<()> {
        let attempts = event.attempts + 1;
        let provider = strategy_for(payment.method).provider_name;

        if attempts >= self.settings.max_event_attempts {
            finalize::fail(
                &mut *tx,
                payment,
                provider,
                err.category().as_str(),
                &err.to_string(),
            )
            .await?;
            payx_db::outbox::mark_failed(&mut *tx, event.event_id, attempts).await?;
            warn!(
                payment_id = %payment.payment_id,
                attempts,
                error = %err,
                "event attempts exhausted; payment failed"
            );
            return Ok(());
        }

        let delay = exp_backoff(
            attempts as u32,
            EVENT_BACKOFF_BASE,
            EVENT_BACKOFF_CAP,
            EVENT_BACKOFF_JITTER,
        );
        let next_attempt_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(5));
        payx_db::outbox::reschedule(&mut *tx, event.event_id, attempts, next_attempt_at).await?;
        debug!(
            event_id = %event.event_id,
            attempts,
            next_attempt_at = %next_attempt_at,
            "event rescheduled"
        );
        Ok(())
    }
}
