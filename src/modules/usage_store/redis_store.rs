use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};

use super::{StoreError, UsageStore};

/// Check-and-increment in one server-side step. Returns -1 at the limit.
const RESERVE_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current >= tonumber(ARGV[1]) then
    return -1
end
local updated = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[2])
return updated
"#;

/// Decrement that never goes below zero and never creates a key
const RELEASE_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current > 0 then
    return redis.call('DECR', KEYS[1])
end
return 0
"#;

/// Redis-backed usage store, shared by every gateway instance
///
/// Expiry is delegated to Redis `EXPIRE`; the `now` argument is only used by
/// the in-process store.
pub struct RedisUsageStore {
    pool: Pool,
    reserve_script: Script,
    release_script: Script,
}

impl RedisUsageStore {
    /// Create the connection pool and verify the server answers
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Connection(format!("Failed to create Redis pool: {}", e)))?;

        let store = Self {
            pool,
            reserve_script: Script::new(RESERVE_SCRIPT),
            release_script: Script::new(RELEASE_SCRIPT),
        };
        store.ping().await?;

        Ok(store)
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to get Redis connection: {}", e)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(format!("Redis ping failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl UsageStore for RedisUsageStore {
    async fn count(&self, key: &str, _now: DateTime<Utc>) -> Result<u32, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<u32> = conn
            .get(key)
            .await
            .map_err(|e| StoreError::Command(format!("Failed to get key '{}': {}", key, e)))?;
        Ok(value.unwrap_or(0))
    }

    async fn reserve(
        &self,
        key: &str,
        limit: u32,
        ttl: Duration,
        _now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        let mut conn = self.connection().await?;
        let ttl_secs = ttl.as_secs().max(1);

        let updated: i64 = self
            .reserve_script
            .key(key)
            .arg(limit)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(format!("Failed to reserve '{}': {}", key, e)))?;

        Ok(u32::try_from(updated).ok())
    }

    async fn release(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: i64 = self
            .release_script
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(format!("Failed to release '{}': {}", key, e)))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    /// Live-server tests run with `REDIS_URL=redis://... cargo test -- --ignored`
    async fn live_store() -> RedisUsageStore {
        let url = std::env::var("REDIS_URL").expect("REDIS_URL must point at a test Redis");
        RedisUsageStore::connect(&url)
            .await
            .expect("Failed to connect to test Redis")
    }

    fn unique_key() -> String {
        format!("usage:test-{}:2025-03-14", uuid::Uuid::new_v4())
    }

    async fn exists(store: &RedisUsageStore, key: &str) -> bool {
        let mut conn = store.connection().await.unwrap();
        conn.exists(key).await.unwrap()
    }

    async fn ttl(store: &RedisUsageStore, key: &str) -> i64 {
        let mut conn = store.connection().await.unwrap();
        conn.ttl(key).await.unwrap()
    }

    async fn cleanup(store: &RedisUsageStore, key: &str) {
        let mut conn = store.connection().await.unwrap();
        let _: i64 = conn.del(key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_live_reserve_increments_until_limit() {
        let store = live_store().await;
        let key = unique_key();
        let now = Utc::now();

        assert_eq!(store.count(&key, now).await.unwrap(), 0);
        assert_eq!(store.reserve(&key, 2, DAY, now).await.unwrap(), Some(1));
        assert_eq!(store.reserve(&key, 2, DAY, now).await.unwrap(), Some(2));
        assert_eq!(store.reserve(&key, 2, DAY, now).await.unwrap(), None);
        assert_eq!(store.count(&key, now).await.unwrap(), 2);

        cleanup(&store, &key).await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_live_zero_limit_never_creates_a_key() {
        let store = live_store().await;
        let key = unique_key();

        assert_eq!(store.reserve(&key, 0, DAY, Utc::now()).await.unwrap(), None);
        assert!(!exists(&store, &key).await);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_live_reserve_sets_expiry() {
        let store = live_store().await;
        let key = unique_key();

        store.reserve(&key, 3, DAY, Utc::now()).await.unwrap();

        let remaining_ttl = ttl(&store, &key).await;
        assert!(remaining_ttl > 0 && remaining_ttl <= DAY.as_secs() as i64);

        cleanup(&store, &key).await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_live_release_floors_at_zero_without_creating_keys() {
        let store = live_store().await;
        let key = unique_key();
        let now = Utc::now();

        store.release(&key).await.unwrap();
        assert!(!exists(&store, &key).await);

        store.reserve(&key, 3, DAY, now).await.unwrap();
        store.release(&key).await.unwrap();
        store.release(&key).await.unwrap();
        assert_eq!(store.count(&key, now).await.unwrap(), 0);

        cleanup(&store, &key).await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_live_concurrent_reservations_never_exceed_limit() {
        let store = Arc::new(live_store().await);
        let key = Arc::new(unique_key());
        let limit = 5;
        let now = Utc::now();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = Arc::clone(&key);
                tokio::spawn(async move { store.reserve(&key, limit, DAY, now).await.unwrap() })
            })
            .collect();

        let granted = futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();

        assert_eq!(granted, limit as usize);
        assert_eq!(store.count(&key, now).await.unwrap(), limit);

        cleanup(&store, &key).await;
    }

    #[tokio::test]
    async fn test_connect_fails_for_invalid_url() {
        let result = RedisUsageStore::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_fails_when_server_is_unreachable() {
        let result = RedisUsageStore::connect("redis://127.0.0.1:1").await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
