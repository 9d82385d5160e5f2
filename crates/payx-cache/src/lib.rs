//! Key-value cache seam.
//!
//! The pipeline treats the cache as an availability optimization, never as
//! the source of truth: every caller is expected to handle [`CacheError`]
//! by failing open or falling back to the database. The trait exists so the
//! Redis client and the in-memory test double are interchangeable.

pub mod keys;
pub mod memory;
pub mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::{MemoryCache, UnreachableCache};
pub use redis_cache::RedisCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("cache unreachable")]
    Unreachable,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// The cache operations the pipeline uses. Mirrors the Redis commands the
/// gates issue; implementations must keep each call atomic on its own but
/// are not expected to provide cross-call transactions.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
    /// SET NX EX. Returns true when this call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;
    async fn incr(&self, key: &str) -> CacheResult<i64>;
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()>;
    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> CacheResult<()>;
    async fn zcard(&self, key: &str) -> CacheResult<i64>;

    async fn lpush(&self, key: &str, value: &str) -> CacheResult<()>;
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> CacheResult<()>;
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>>;
}
