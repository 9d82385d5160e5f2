//! AML evaluation: destination blocklist, aggregate-volume window, and
//! structuring detection, short-circuited in that order.
//!
//! The data source is a capped per-customer history list in the cache with
//! `timestamp|rail|amount` entries; when the cache is unreachable the
//! engine falls back to authoritative DB aggregates over non-BLOCKED
//! payments.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::warn;

use payx_cache::keys::{aml_history_key, AML_HISTORY_MAX_ITEMS};
use payx_cache::Cache;
use payx_schemas::enums::{AmlDecision, PaymentMethod};
use payx_schemas::{AdmissionError, LimitsPolicy};

/// Authoritative aggregates used when the cache history is unavailable.
#[async_trait]
pub trait AmlStore: Send {
    async fn sum_outgoing_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Decimal>;

    async fn count_near_threshold_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
        low_amount: Decimal,
        high_amount: Decimal,
    ) -> anyhow::Result<i64>;
}

#[async_trait]
impl AmlStore for PgConnection {
    async fn sum_outgoing_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Decimal> {
        Ok(payx_db::payments::sum_outgoing_since(self, customer_id, rail, since).await?)
    }

    async fn count_near_threshold_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
        low_amount: Decimal,
        high_amount: Decimal,
    ) -> anyhow::Result<i64> {
        Ok(payx_db::payments::count_near_threshold_since(
            self,
            customer_id,
            rail,
            since,
            low_amount,
            high_amount,
        )
        .await?)
    }
}

#[derive(Debug, Clone)]
pub struct AmlConfig {
    pub blocklist_destinations: HashSet<String>,
    pub total_window_seconds: i64,
    pub total_threshold_amount: Decimal,
    pub structuring_window_seconds: i64,
    pub structuring_count_threshold: i64,
}

pub struct AmlEngine {
    cache: Arc<dyn Cache>,
    config: AmlConfig,
}

/// Lower bound of the structuring band: 0.95 × policy max.
fn structuring_low(max_amount: Decimal) -> Decimal {
    max_amount * Decimal::new(95, 2)
}

impl AmlEngine {
    pub fn new(cache: Arc<dyn Cache>, config: AmlConfig) -> Self {
        Self { cache, config }
    }

    pub async fn evaluate<S: AmlStore>(
        &self,
        store: &mut S,
        customer_id: &str,
        rail: PaymentMethod,
        amount: Decimal,
        destination: Option<&str>,
        policy: &LimitsPolicy,
    ) -> Result<AmlDecision, AdmissionError> {
        if let Some(destination) = destination {
            if self.config.blocklist_destinations.contains(destination) {
                return Ok(AmlDecision::Block);
            }
        }

        let total = self.total_outgoing_recent(store, customer_id, rail).await?;
        if total + amount > self.config.total_threshold_amount {
            return Ok(AmlDecision::Review);
        }

        let mut near_count = self
            .near_threshold_count(store, customer_id, rail, policy.max_amount)
            .await?;
        if amount >= structuring_low(policy.max_amount) {
            near_count += 1;
        }
        if near_count >= self.config.structuring_count_threshold {
            return Ok(AmlDecision::Review);
        }

        Ok(AmlDecision::Allow)
    }

    /// Best-effort append to the history after a non-blocked admission.
    /// Cache failures are logged and swallowed; the DB fallback covers the
    /// gap.
    pub async fn record_outgoing(&self, customer_id: &str, rail: PaymentMethod, amount: Decimal) {
        let entry = format!("{}|{}|{}", Utc::now().timestamp(), rail.as_str(), amount);
        let key = aml_history_key(customer_id);
        let ttl = Duration::from_secs(
            self.config
                .total_window_seconds
                .max(self.config.structuring_window_seconds)
                .max(1) as u64,
        );

        let result = async {
            self.cache.lpush(&key, &entry).await?;
            self.cache.ltrim(&key, 0, AML_HISTORY_MAX_ITEMS).await?;
            self.cache.expire(&key, ttl).await
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, customer_id, "aml history write failed");
        }
    }

    async fn total_outgoing_recent<S: AmlStore>(
        &self,
        store: &mut S,
        customer_id: &str,
        rail: PaymentMethod,
    ) -> Result<Decimal, AdmissionError> {
        let cutoff = Utc::now().timestamp() - self.config.total_window_seconds;
        if let Some(entries) = self.read_history(customer_id).await {
            return Ok(sum_recent(&entries, rail, cutoff));
        }

        let since = Utc::now() - chrono::Duration::seconds(self.config.total_window_seconds);
        Ok(store.sum_outgoing_since(customer_id, rail, since).await?)
    }

    async fn near_threshold_count<S: AmlStore>(
        &self,
        store: &mut S,
        customer_id: &str,
        rail: PaymentMethod,
        max_amount: Decimal,
    ) -> Result<i64, AdmissionError> {
        let cutoff = Utc::now().timestamp() - self.config.structuring_window_seconds;
        let low = structuring_low(max_amount);
        if let Some(entries) = self.read_history(customer_id).await {
            return Ok(count_near(&entries, rail, cutoff, low, max_amount));
        }

        let since = Utc::now() - chrono::Duration::seconds(self.config.structuring_window_seconds);
        Ok(store
            .count_near_threshold_since(customer_id, rail, since, low, max_amount)
            .await?)
    }

    async fn read_history(&self, customer_id: &str) -> Option<Vec<String>> {
        let key = aml_history_key(customer_id);
        match self.cache.lrange(&key, 0, AML_HISTORY_MAX_ITEMS).await {
            Ok(entries) => Some(entries),
            Err(err) => {
                warn!(error = %err, customer_id, "aml history read failed; using DB fallback");
                None
            }
        }
    }
}

fn sum_recent(entries: &[String], rail: PaymentMethod, cutoff: i64) -> Decimal {
    entries
        .iter()
        .filter_map(|entry| parse_entry(entry))
        .filter(|(ts, entry_rail, _)| *ts >= cutoff && *entry_rail == rail)
        .map(|(_, _, amount)| amount)
        .sum()
}

fn count_near(
    entries: &[String],
    rail: PaymentMethod,
    cutoff: i64,
    low: Decimal,
    high: Decimal,
) -> i64 {
    entries
        .iter()
        .filter_map(|entry| parse_entry(entry))
        .filter(|(ts, entry_rail, amount)| {
            *ts >= cutoff && *entry_rail == rail && *amount >= low && *amount <= high
        })
        .count() as i64
}

/// `timestamp|rail|amount`; malformed entries are skipped, never fatal.
fn parse_entry(entry: &str) -> Option<(i64, PaymentMethod, Decimal)> {
    let mut parts = entry.splitn(3, '|');
    let ts = parts.next()?.parse::<i64>().ok()?;
    let rail = PaymentMethod::parse(parts.next()?).ok()?;
    let amount = parts.next()?.parse::<Decimal>().ok()?;
    Some((ts, rail, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use payx_cache::{MemoryCache, UnreachableCache};
    use rust_decimal_macros::dec;

    struct StubStore {
        sum: Decimal,
        near_count: i64,
    }

    #[async_trait]
    impl AmlStore for StubStore {
        async fn sum_outgoing_since(
            &mut self,
            _customer_id: &str,
            _rail: PaymentMethod,
            _since: DateTime<Utc>,
        ) -> anyhow::Result<Decimal> {
            Ok(self.sum)
        }

        async fn count_near_threshold_since(
            &mut self,
            _customer_id: &str,
            _rail: PaymentMethod,
            _since: DateTime<Utc>,
            _low_amount: Decimal,
            _high_amount: Decimal,
        ) -> anyhow::Result<i64> {
            Ok(self.near_count)
        }
    }

    fn config() -> AmlConfig {
        AmlConfig {
            blocklist_destinations: ["dest-blocked-001", "dest-blocked-002"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            total_window_seconds: 600,
            total_threshold_amount: dec!(5000.00),
            structuring_window_seconds: 900,
            structuring_count_threshold: 3,
        }
    }

    fn pix_policy(max_amount: Decimal) -> LimitsPolicy {
        LimitsPolicy {
            rail: PaymentMethod::PIX,
            min_amount: dec!(0.01),
            max_amount,
            daily_limit_amount: dec!(100000.00),
            velocity_limit_count: 100,
            velocity_window_seconds: 60,
        }
    }

    fn empty_store() -> StubStore {
        StubStore {
            sum: Decimal::ZERO,
            near_count: 0,
        }
    }

    #[tokio::test]
    async fn blocklisted_destination_blocks_immediately() {
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(1.00),
                Some("dest-blocked-001"),
                &pix_policy(dec!(1000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Block);
    }

    #[tokio::test]
    async fn quiet_history_allows() {
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(10.00),
                Some("dest-1"),
                &pix_policy(dec!(1000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);
    }

    #[tokio::test]
    async fn aggregate_window_reviews_when_threshold_exceeded() {
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(3000.00))
            .await;
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(1990.00))
            .await;

        // 4990 + 20 > 5000 → REVIEW.
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(20.00),
                Some("dest-1"),
                &pix_policy(dec!(100000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Review);

        // 4990 + 10 == 5000 is not over the threshold.
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(10.00),
                Some("dest-1"),
                &pix_policy(dec!(100000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);
    }

    #[tokio::test]
    async fn aggregate_window_only_counts_the_same_rail() {
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        engine
            .record_outgoing("c-1", PaymentMethod::TED, dec!(4990.00))
            .await;
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(20.00),
                Some("dest-1"),
                &pix_policy(dec!(100000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);
    }

    #[tokio::test]
    async fn structuring_trips_on_the_third_near_max_payment() {
        // policy.max = 100.00, band is [95.00, 100.00], threshold 3.
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(96.00))
            .await;
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(97.00))
            .await;

        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(98.00),
                Some("dest-1"),
                &pix_policy(dec!(100.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Review);
    }

    #[tokio::test]
    async fn structuring_count_increases_by_exactly_one_per_near_max_entry() {
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        let policy = pix_policy(dec!(100.00));

        // One stored near-max entry + the current in-band amount = 2 < 3.
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(96.00))
            .await;
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(98.00),
                Some("dest-1"),
                &policy,
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);

        // Adding one more near-max entry tips it to 3.
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(97.00))
            .await;
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(98.00),
                Some("dest-1"),
                &policy,
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Review);
    }

    #[tokio::test]
    async fn below_band_amounts_do_not_count_toward_structuring() {
        let engine = AmlEngine::new(Arc::new(MemoryCache::new()), config());
        let policy = pix_policy(dec!(100.00));
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(94.99))
            .await;
        engine
            .record_outgoing("c-1", PaymentMethod::PIX, dec!(96.00))
            .await;
        // Stored: one in band; current 50.00 out of band → 1 < 3.
        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(50.00),
                Some("dest-1"),
                &policy,
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);
    }

    #[tokio::test]
    async fn entries_outside_the_window_are_ignored() {
        let cache = Arc::new(MemoryCache::new());
        let engine = AmlEngine::new(cache.clone(), config());
        let stale_ts = Utc::now().timestamp() - 10_000;
        cache
            .lpush("aml:history:c-1", &format!("{stale_ts}|PIX|96.00"))
            .await
            .unwrap();
        cache
            .lpush("aml:history:c-1", &format!("{stale_ts}|PIX|4990.00"))
            .await
            .unwrap();

        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(98.00),
                Some("dest-1"),
                &pix_policy(dec!(100.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);
    }

    #[tokio::test]
    async fn malformed_history_entries_are_skipped() {
        let cache = Arc::new(MemoryCache::new());
        let engine = AmlEngine::new(cache.clone(), config());
        cache.lpush("aml:history:c-1", "garbage").await.unwrap();
        cache.lpush("aml:history:c-1", "1|2|3|4").await.unwrap();

        let decision = engine
            .evaluate(
                &mut empty_store(),
                "c-1",
                PaymentMethod::PIX,
                dec!(10.00),
                Some("dest-1"),
                &pix_policy(dec!(1000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Allow);
    }

    #[tokio::test]
    async fn cache_failure_falls_back_to_store_aggregates() {
        let engine = AmlEngine::new(Arc::new(UnreachableCache), config());
        let mut store = StubStore {
            sum: dec!(4990.00),
            near_count: 0,
        };
        let decision = engine
            .evaluate(
                &mut store,
                "c-1",
                PaymentMethod::PIX,
                dec!(20.00),
                Some("dest-1"),
                &pix_policy(dec!(100000.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Review);

        let mut store = StubStore {
            sum: Decimal::ZERO,
            near_count: 2,
        };
        let decision = engine
            .evaluate(
                &mut store,
                "c-1",
                PaymentMethod::PIX,
                dec!(98.00),
                Some("dest-1"),
                &pix_policy(dec!(100.00)),
            )
            .await
            .unwrap();
        assert_eq!(decision, AmlDecision::Review);
    }

    #[tokio::test]
    async fn history_is_trimmed_to_the_cap() {
        let cache = Arc::new(MemoryCache::new());
        let engine = AmlEngine::new(cache.clone(), config());
        for _ in 0..(AML_HISTORY_MAX_ITEMS + 20) {
            engine
                .record_outgoing("c-1", PaymentMethod::PIX, dec!(1.00))
                .await;
        }
        let entries = cache
            .lrange("aml:history:c-1", 0, AML_HISTORY_MAX_ITEMS + 50)
            .await
            .unwrap();
        assert!(entries.len() as i64 <= AML_HISTORY_MAX_ITEMS + 1);
    }
}
