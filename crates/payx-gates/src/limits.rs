use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::warn;

use payx_cache::{keys, Cache, CacheError};
use payx_schemas::enums::PaymentMethod;
use payx_schemas::money::decimal_to_cents;
use payx_schemas::{AdmissionError, LimitsPolicy};

/// Policy lookup seam. Implemented by `PgConnection`; tests provide stubs.
#[async_trait]
pub trait PolicyStore: Send {
    async fn policy_by_rail(&mut self, rail: PaymentMethod)
        -> anyhow::Result<Option<LimitsPolicy>>;
}

/// Authoritative aggregates used when the cache is unhealthy.
#[async_trait]
pub trait OutgoingStore: Send {
    async fn sum_outgoing_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Decimal>;

    async fn count_outgoing_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64>;
}

#[async_trait]
impl PolicyStore for PgConnection {
    async fn policy_by_rail(
        &mut self,
        rail: PaymentMethod,
    ) -> anyhow::Result<Option<LimitsPolicy>> {
        Ok(payx_db::limits::get_policy_by_rail(self, rail).await?)
    }
}

#[async_trait]
impl OutgoingStore for PgConnection {
    async fn sum_outgoing_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Decimal> {
        Ok(payx_db::payments::sum_outgoing_since(self, customer_id, rail, since).await?)
    }

    async fn count_outgoing_since(
        &mut self,
        customer_id: &str,
        rail: PaymentMethod,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        Ok(payx_db::payments::count_outgoing_since(self, customer_id, rail, since).await?)
    }
}

#[derive(Debug, Clone)]
pub struct LimitsEvaluation {
    pub policy: LimitsPolicy,
    /// Projected velocity including this payment; consumed by the risk
    /// engine.
    pub velocity_count: i64,
}

/// Per-rail min/max, daily-sum and velocity enforcement.
///
/// The cache path is not ACID: two concurrent admissions can both observe
/// `count = limit - 1` and pass. Accepted slack; the DB aggregates are the
/// final defense and take over whenever the cache misbehaves.
pub struct LimitsService {
    cache: Arc<dyn Cache>,
    policy_cache_ttl: Duration,
}

impl LimitsService {
    pub fn new(cache: Arc<dyn Cache>, policy_cache_ttl: Duration) -> Self {
        Self {
            cache,
            policy_cache_ttl,
        }
    }

    /// Check order is load-bearing: the policy feeds the bound checks, and
    /// the velocity result feeds the risk engine.
    pub async fn enforce<S>(
        &self,
        store: &mut S,
        customer_id: &str,
        rail: PaymentMethod,
        amount: Decimal,
    ) -> Result<LimitsEvaluation, AdmissionError>
    where
        S: PolicyStore + OutgoingStore,
    {
        let policy = self.get_policy(store, rail).await?;
        enforce_transaction_amount(&policy, amount)?;
        self.enforce_daily_limit(store, customer_id, rail, amount, &policy)
            .await?;
        let velocity_count = self
            .enforce_velocity_limit(store, customer_id, rail, &policy)
            .await?;
        Ok(LimitsEvaluation {
            policy,
            velocity_count,
        })
    }

    async fn get_policy<S: PolicyStore>(
        &self,
        store: &mut S,
        rail: PaymentMethod,
    ) -> Result<LimitsPolicy, AdmissionError> {
        let cache_key = keys::limits_policy_key(rail);
        if let Ok(Some(cached)) = self.cache.get(&cache_key).await {
            if let Ok(policy) = serde_json::from_str::<LimitsPolicy>(&cached) {
                return Ok(policy);
            }
        }

        let policy = store
            .policy_by_rail(rail)
            .await?
            .ok_or_else(|| {
                AdmissionError::Validation(format!(
                    "Missing limits policy for rail {}",
                    rail.as_str()
                ))
            })?;

        match serde_json::to_string(&policy) {
            Ok(encoded) => {
                if let Err(err) = self.cache.set(&cache_key, &encoded, self.policy_cache_ttl).await
                {
                    warn!(error = %err, rail = rail.as_str(), "policy cache write failed");
                }
            }
            Err(err) => warn!(error = %err, "policy serialization failed"),
        }
        Ok(policy)
    }

    async fn enforce_daily_limit<S: OutgoingStore>(
        &self,
        store: &mut S,
        customer_id: &str,
        rail: PaymentMethod,
        amount: Decimal,
        policy: &LimitsPolicy,
    ) -> Result<(), AdmissionError> {
        let amount_cents = decimal_to_cents(amount);
        let limit_cents = decimal_to_cents(policy.daily_limit_amount);
        let date_key = Utc::now().format("%Y%m%d").to_string();
        let cache_key = keys::limits_daily_key(&date_key, customer_id, rail);

        match self
            .daily_via_cache(&cache_key, amount_cents, limit_cents, rail)
            .await
        {
            Ok(verdict) => return verdict,
            Err(err) => {
                warn!(error = %err, rail = rail.as_str(), "daily limit cache path failed; using DB fallback");
            }
        }

        let total = store
            .sum_outgoing_since(customer_id, rail, utc_day_start())
            .await?;
        if total + amount > policy.daily_limit_amount {
            return Err(daily_limit_exceeded(rail));
        }
        Ok(())
    }

    /// Cache-side daily check. The outer Err means the cache is unhealthy
    /// and the caller must consult the database instead.
    async fn daily_via_cache(
        &self,
        cache_key: &str,
        amount_cents: i64,
        limit_cents: i64,
        rail: PaymentMethod,
    ) -> Result<Result<(), AdmissionError>, CacheError> {
        let current = match self.cache.get(cache_key).await? {
            Some(raw) => raw.parse::<i64>().map_err(|_| CacheError::Unreachable)?,
            None => 0,
        };
        let projected = current + amount_cents;
        if projected > limit_cents {
            return Ok(Err(daily_limit_exceeded(rail)));
        }
        self.cache
            .set(cache_key, &projected.to_string(), seconds_until_day_end())
            .await?;
        Ok(Ok(()))
    }

    async fn enforce_velocity_limit<S: OutgoingStore>(
        &self,
        store: &mut S,
        customer_id: &str,
        rail: PaymentMethod,
        policy: &LimitsPolicy,
    ) -> Result<i64, AdmissionError> {
        let cache_key = keys::limits_velocity_key(customer_id, rail);

        match self.velocity_via_cache(&cache_key, policy, rail).await {
            Ok(verdict) => return verdict,
            Err(err) => {
                warn!(error = %err, rail = rail.as_str(), "velocity cache path failed; using DB fallback");
            }
        }

        let since = Utc::now() - chrono::Duration::seconds(policy.velocity_window_seconds);
        let count = store.count_outgoing_since(customer_id, rail, since).await?;
        if count >= policy.velocity_limit_count as i64 {
            return Err(velocity_limit_exceeded(rail));
        }
        Ok(count + 1)
    }

    async fn velocity_via_cache(
        &self,
        cache_key: &str,
        policy: &LimitsPolicy,
        rail: PaymentMethod,
    ) -> Result<Result<i64, AdmissionError>, CacheError> {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        let window_start = now - policy.velocity_window_seconds as f64;

        self.cache
            .zremrangebyscore(cache_key, 0.0, window_start)
            .await?;
        let count = self.cache.zcard(cache_key).await?;
        if count >= policy.velocity_limit_count as i64 {
            return Ok(Err(velocity_limit_exceeded(rail)));
        }
        let member = format!("{now}-{count}");
        self.cache.zadd(cache_key, &member, now).await?;
        self.cache
            .expire(
                cache_key,
                Duration::from_secs(policy.velocity_window_seconds.max(1) as u64),
            )
            .await?;
        Ok(Ok(count + 1))
    }
}

fn enforce_transaction_amount(policy: &LimitsPolicy, amount: Decimal) -> Result<(), AdmissionError> {
    if amount < policy.min_amount {
        return Err(AdmissionError::LimitExceeded(format!(
            "Amount below min limit for {}",
            policy.rail.as_str()
        )));
    }
    if amount > policy.max_amount {
        return Err(AdmissionError::LimitExceeded(format!(
            "Amount above max limit for {}",
            policy.rail.as_str()
        )));
    }
    Ok(())
}

fn daily_limit_exceeded(rail: PaymentMethod) -> AdmissionError {
    AdmissionError::LimitExceeded(format!("Daily limit exceeded for rail {}", rail.as_str()))
}

fn velocity_limit_exceeded(rail: PaymentMethod) -> AdmissionError {
    AdmissionError::LimitExceeded(format!("Velocity limit exceeded for rail {}", rail.as_str()))
}

fn utc_day_start() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now)
}

/// TTL for the daily counter: seconds remaining until 23:59:59 UTC.
fn seconds_until_day_end() -> Duration {
    let now = Utc::now();
    let end = now
        .with_hour(23)
        .and_then(|t| t.with_minute(59))
        .and_then(|t| t.with_second(59))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    Duration::from_secs((end - now).num_seconds().max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use payx_cache::{MemoryCache, UnreachableCache};
    use payx_schemas::enums::ErrorCategory;
    use rust_decimal_macros::dec;

    struct StubStore {
        policy: Option<LimitsPolicy>,
        policy_reads: usize,
        sum: Decimal,
        count: i64,
    }

    impl StubStore {
        fn with_policy(policy: LimitsPolicy) -> Self {
            Self {
                policy: Some(policy),
                policy_reads: 0,
                sum: Decimal::ZERO,
                count: 0,
            }
        }
    }

    #[async_trait]
    impl PolicyStore for StubStore {
        async fn policy_by_rail(
            &mut self,
            _rail: PaymentMethod,
        ) -> anyhow::Result<Option<LimitsPolicy>> {
            self.policy_reads += 1;
            Ok(self.policy.clone())
        }
    }

    #[async_trait]
    impl OutgoingStore for StubStore {
        async fn sum_outgoing_since(
            &mut self,
            _customer_id: &str,
            _rail: PaymentMethod,
            _since: DateTime<Utc>,
        ) -> anyhow::Result<Decimal> {
            Ok(self.sum)
        }

        async fn count_outgoing_since(
            &mut self,
            _customer_id: &str,
            _rail: PaymentMethod,
            _since: DateTime<Utc>,
        ) -> anyhow::Result<i64> {
            Ok(self.count)
        }
    }

    fn pix_policy() -> LimitsPolicy {
        LimitsPolicy {
            rail: PaymentMethod::PIX,
            min_amount: dec!(1.00),
            max_amount: dec!(1000.00),
            daily_limit_amount: dec!(100.00),
            velocity_limit_count: 100,
            velocity_window_seconds: 60,
        }
    }

    fn service(cache: Arc<dyn Cache>) -> LimitsService {
        LimitsService::new(cache, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn amount_bounds_are_enforced() {
        let svc = service(Arc::new(MemoryCache::new()));
        let mut store = StubStore::with_policy(pix_policy());

        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(0.50))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::LimitExceeded);
        assert!(err.to_string().contains("below min"));

        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(1000.01))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("above max"));
    }

    #[tokio::test]
    async fn missing_policy_is_a_validation_error() {
        let svc = service(Arc::new(MemoryCache::new()));
        let mut store = StubStore {
            policy: None,
            policy_reads: 0,
            sum: Decimal::ZERO,
            count: 0,
        };
        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::TED, dec!(10.00))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ValidationError);
    }

    #[tokio::test]
    async fn policy_is_served_from_cache_after_first_read() {
        let svc = service(Arc::new(MemoryCache::new()));
        let mut store = StubStore::with_policy(pix_policy());
        svc.enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(10.00))
            .await
            .unwrap();
        svc.enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(10.00))
            .await
            .unwrap();
        assert_eq!(store.policy_reads, 1);
    }

    #[tokio::test]
    async fn daily_counter_trips_on_projection() {
        let svc = service(Arc::new(MemoryCache::new()));
        let mut store = StubStore::with_policy(pix_policy());
        svc.enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(60.00))
            .await
            .unwrap();
        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(60.00))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Daily limit exceeded"));
        // A different customer has an untouched counter.
        svc.enforce(&mut store, "c-2", PaymentMethod::PIX, dec!(60.00))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn velocity_counts_and_trips_in_the_window() {
        let svc = service(Arc::new(MemoryCache::new()));
        let mut policy = pix_policy();
        policy.velocity_limit_count = 2;
        policy.daily_limit_amount = dec!(100000.00);
        let mut store = StubStore::with_policy(policy);

        let first = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(1.00))
            .await
            .unwrap();
        assert_eq!(first.velocity_count, 1);
        let second = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(1.00))
            .await
            .unwrap();
        assert_eq!(second.velocity_count, 2);
        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(1.00))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Velocity limit exceeded"));
    }

    #[tokio::test]
    async fn db_fallback_is_authoritative_when_cache_is_down() {
        let svc = service(Arc::new(UnreachableCache));
        let mut store = StubStore::with_policy(pix_policy());
        store.sum = dec!(90.00);
        // 90 + 20 > 100 → rejected straight from the DB aggregate.
        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(20.00))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Daily limit exceeded"));

        // Under the daily limit but at the velocity limit.
        store.sum = dec!(0.00);
        store.count = 100;
        let err = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(20.00))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Velocity limit exceeded"));

        store.count = 4;
        let eval = svc
            .enforce(&mut store, "c-1", PaymentMethod::PIX, dec!(20.00))
            .await
            .unwrap();
        assert_eq!(eval.velocity_count, 5);
    }
}
