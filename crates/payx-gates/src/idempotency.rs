use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use payx_cache::{keys, Cache};

/// Cache-side admission lock for `(merchant_id, idempotency_key)`.
///
/// Fails open by design: if the cache is unreachable the admission proceeds
/// and the database unique constraint stays the source of truth for
/// duplicate suppression.
pub struct IdempotencyGate {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl IdempotencyGate {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// True on first acquisition within the TTL window.
    pub async fn acquire(&self, merchant_id: &str, idempotency_key: &str) -> bool {
        let scoped = keys::idempotency_scoped_key(merchant_id, idempotency_key);
        match self.cache.set_if_absent(&scoped, "1", self.ttl).await {
            Ok(acquired) => acquired,
            Err(err) => {
                warn!(
                    error = %err,
                    idempotency_key,
                    "idempotency cache unavailable; admitting (DB constraint is authoritative)"
                );
                true
            }
        }
    }
}
