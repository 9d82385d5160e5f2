use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::{Cache, CacheResult};

/// Redis-backed cache. The `ConnectionManager` handle is cloneable and
/// reconnects on its own, so one `RedisCache` is shared by every admission
/// task and the worker alike.
#[derive(Clone)]
pub struct RedisCache {
    manager: redis::aio::ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.expire(key, ttl.as_secs().max(1) as i64).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.zrembyscore(key, min, max).await?;
        Ok(())
    }

    async fn zcard(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn lpush(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.ltrim(key, start as isize, stop as isize).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>> {
        let mut conn = self.manager.clone();
        let values: Vec<String> = conn.lrange(key, start as isize, stop as isize).await?;
        Ok(values)
    }
}
