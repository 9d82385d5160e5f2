//! In-memory cache doubles for tests: a faithful single-process
//! implementation of the trait, and one that always fails so the fail-open
//! paths can be exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{Cache, CacheError, CacheResult};

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    SortedSet(BTreeMap<String, f64>),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() < deadline,
            None => true,
        }
    }
}

/// Single-process implementation with real TTL semantics. Not shared
/// between processes, so it is test-only by construction; the trait keeps
/// it honest against the Redis implementation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> T {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|_, entry| entry.live());
        f(&mut entries)
    }
}

fn deadline(ttl: Duration) -> Option<Instant> {
    Some(Instant::now() + ttl)
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.with_entries(|entries| match entries.get(key) {
            Some(Entry {
                value: Stored::Text(text),
                ..
            }) => Some(text.clone()),
            _ => None,
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.with_entries(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Stored::Text(value.to_string()),
                    expires_at: deadline(ttl),
                },
            );
        });
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        Ok(self.with_entries(|entries| {
            if entries.contains_key(key) {
                return false;
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: Stored::Text(value.to_string()),
                    expires_at: deadline(ttl),
                },
            );
            true
        }))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        self.with_entries(|entries| {
            let entry = entries.entry(key.to_string()).or_insert(Entry {
                value: Stored::Text("0".to_string()),
                expires_at: None,
            });
            match &mut entry.value {
                Stored::Text(text) => {
                    let current: i64 = text.parse().map_err(|_| CacheError::Unreachable)?;
                    let next = current + 1;
                    *text = next.to_string();
                    Ok(next)
                }
                _ => Err(CacheError::Unreachable),
            }
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        self.with_entries(|entries| {
            if let Some(entry) = entries.get_mut(key) {
                entry.expires_at = deadline(ttl);
            }
        });
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()> {
        self.with_entries(|entries| {
            let entry = entries.entry(key.to_string()).or_insert(Entry {
                value: Stored::SortedSet(BTreeMap::new()),
                expires_at: None,
            });
            if let Stored::SortedSet(set) = &mut entry.value {
                set.insert(member.to_string(), score);
            }
        });
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> CacheResult<()> {
        self.with_entries(|entries| {
            if let Some(Entry {
                value: Stored::SortedSet(set),
                ..
            }) = entries.get_mut(key)
            {
                set.retain(|_, score| *score < min || *score > max);
            }
        });
        Ok(())
    }

    async fn zcard(&self, key: &str) -> CacheResult<i64> {
        Ok(self.with_entries(|entries| match entries.get(key) {
            Some(Entry {
                value: Stored::SortedSet(set),
                ..
            }) => set.len() as i64,
            _ => 0,
        }))
    }

    async fn lpush(&self, key: &str, value: &str) -> CacheResult<()> {
        self.with_entries(|entries| {
            let entry = entries.entry(key.to_string()).or_insert(Entry {
                value: Stored::List(Vec::new()),
                expires_at: None,
            });
            if let Stored::List(list) = &mut entry.value {
                list.insert(0, value.to_string());
            }
        });
        Ok(())
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> CacheResult<()> {
        self.with_entries(|entries| {
            if let Some(Entry {
                value: Stored::List(list),
                ..
            }) = entries.get_mut(key)
            {
                let len = list.len() as i64;
                let from = start.clamp(0, len);
                let to = if stop < 0 { len + stop + 1 } else { (stop + 1).min(len) };
                if from >= to {
                    list.clear();
                } else {
                    *list = list[from as usize..to as usize].to_vec();
                }
            }
        });
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>> {
        Ok(self.with_entries(|entries| match entries.get(key) {
            Some(Entry {
                value: Stored::List(list),
                ..
            }) => {
                let len = list.len() as i64;
                let from = start.clamp(0, len);
                let to = if stop < 0 { len + stop + 1 } else { (stop + 1).min(len) };
                if from >= to {
                    Vec::new()
                } else {
                    list[from as usize..to as usize].to_vec()
                }
            }
            _ => Vec::new(),
        }))
    }
}

/// Cache double whose every operation fails, for exercising fail-open and
/// DB-fallback behavior.
#[derive(Debug, Default)]
pub struct UnreachableCache;

#[async_trait]
impl Cache for UnreachableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unreachable)
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unreachable)
    }
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<bool> {
        Err(CacheError::Unreachable)
    }
    async fn incr(&self, _key: &str) -> CacheResult<i64> {
        Err(CacheError::Unreachable)
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unreachable)
    }
    async fn zadd(&self, _key: &str, _member: &str, _score: f64) -> CacheResult<()> {
        Err(CacheError::Unreachable)
    }
    async fn zremrangebyscore(&self, _key: &str, _min: f64, _max: f64) -> CacheResult<()> {
        Err(CacheError::Unreachable)
    }
    async fn zcard(&self, _key: &str) -> CacheResult<i64> {
        Err(CacheError::Unreachable)
    }
    async fn lpush(&self, _key: &str, _value: &str) -> CacheResult<()> {
        Err(CacheError::Unreachable)
    }
    async fn ltrim(&self, _key: &str, _start: i64, _stop: i64) -> CacheResult<()> {
        Err(CacheError::Unreachable)
    }
    async fn lrange(&self, _key: &str, _start: i64, _stop: i64) -> CacheResult<Vec<String>> {
        Err(CacheError::Unreachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_if_absent_is_first_writer_wins() {
        let cache = MemoryCache::new();
        assert!(cache
            .set_if_absent("k", "1", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!cache
            .set_if_absent("k", "2", Duration::from_secs(60))
            .await
            .unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn expired_keys_vanish() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        // And the slot is reusable for set_if_absent.
        assert!(cache
            .set_if_absent("k", "again", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn incr_counts_from_zero() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("counter").await.unwrap(), 1);
        assert_eq!(cache.incr("counter").await.unwrap(), 2);
        assert_eq!(cache.incr("counter").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sorted_set_trim_and_count() {
        let cache = MemoryCache::new();
        cache.zadd("z", "a", 10.0).await.unwrap();
        cache.zadd("z", "b", 20.0).await.unwrap();
        cache.zadd("z", "c", 30.0).await.unwrap();
        assert_eq!(cache.zcard("z").await.unwrap(), 3);
        cache.zremrangebyscore("z", 0.0, 20.0).await.unwrap();
        assert_eq!(cache.zcard("z").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_push_trim_range() {
        let cache = MemoryCache::new();
        for i in 0..5 {
            cache.lpush("l", &format!("v{i}")).await.unwrap();
        }
        // Most recent first.
        let all = cache.lrange("l", 0, -1).await.unwrap();
        assert_eq!(all, vec!["v4", "v3", "v2", "v1", "v0"]);
        cache.ltrim("l", 0, 2).await.unwrap();
        assert_eq!(cache.lrange("l", 0, -1).await.unwrap(), vec!["v4", "v3", "v2"]);
        assert_eq!(cache.lrange("l", 0, 100).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unreachable_cache_fails_everything() {
        let cache = UnreachableCache;
        assert!(cache.get("k").await.is_err());
        assert!(cache.incr("k").await.is_err());
        assert!(cache.zcard("k").await.is_err());
    }
}
