use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use payx_cache::{keys, Cache};
use payx_schemas::enums::RateLimitDimension;
use payx_schemas::AdmissionError;

/// Fixed-window counters across the merchant, customer and account
/// dimensions. Not authoritative: cache failures admit the request.
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    merchant_limit: i64,
    customer_limit: i64,
    account_limit: i64,
    window_seconds: i64,
}

impl RateLimiter {
    pub fn new(
        cache: Arc<dyn Cache>,
        merchant_limit: i64,
        customer_limit: i64,
        account_limit: i64,
        window_seconds: i64,
    ) -> Self {
        Self {
            cache,
            merchant_limit,
            customer_limit,
            account_limit,
            window_seconds,
        }
    }

    /// Check all three dimensions; the error names the first one that
    /// tripped.
    pub async fn enforce(
        &self,
        merchant_id: &str,
        customer_id: &str,
        account_id: &str,
    ) -> Result<(), AdmissionError> {
        let bucket = Utc::now().timestamp() / self.window_seconds.max(1);
        let checks = [
            (RateLimitDimension::Merchant, merchant_id, self.merchant_limit),
            (RateLimitDimension::Customer, customer_id, self.customer_limit),
            (RateLimitDimension::Account, account_id, self.account_limit),
        ];
        for (dimension, value, limit) in checks {
            if !self.allow(dimension, value, bucket, limit).await {
                return Err(AdmissionError::RateLimited(dimension));
            }
        }
        Ok(())
    }

    async fn allow(
        &self,
        dimension: RateLimitDimension,
        value: &str,
        bucket: i64,
        limit: i64,
    ) -> bool {
        let key = keys::rate_limit_key(dimension, value, bucket);
        let count = match self.cache.incr(&key).await {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    error = %err,
                    dimension = dimension.as_str(),
                    "rate limit cache unavailable; admitting"
                );
                return true;
            }
        };
        if count == 1 {
            // First hit in this bucket starts the window; a failed expire
            // only means the counter lives a little longer.
            if let Err(err) = self
                .cache
                .expire(&key, std::time::Duration::from_secs(self.window_seconds.max(1) as u64))
                .await
            {
                warn!(error = %err, "rate limit expire failed");
            }
        }
        count <= limit
    }
}
