use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Per-key bounded concurrency. One instance per process, keyed by provider
/// name; each key gets its own semaphore with the configured limit.
///
/// `acquire` suspends until a slot frees up. The returned permit releases
/// the slot on drop, which covers every exit path including cancellation at
/// a task boundary.
#[derive(Debug)]
pub struct Bulkhead {
    limit_per_key: usize,
    slots: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Bulkhead {
    pub fn new(limit_per_key: usize) -> Self {
        Self {
            limit_per_key,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, key: &str) -> OwnedSemaphorePermit {
        let semaphore = {
            let mut slots = self
                .slots
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(
                slots
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(self.limit_per_key))),
            )
        };
        semaphore
            .acquire_owned()
            .await
            .expect("bulkhead semaphores are never closed")
    }

    /// Free slots currently available for a key (full limit if never used).
    pub fn available(&self, key: &str) -> usize {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .get(key)
            .map(|s| s.available_permits())
            .unwrap_or(self.limit_per_key)
    }
}
