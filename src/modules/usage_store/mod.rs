//! Usage store module
//!
//! Time-boxed counters backing the daily usage limiter. Every write (re)sets a
//! time-to-live on the record, so stale days disappear without a cleanup job.

mod memory_store;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::error::AppError;

pub use memory_store::MemoryUsageStore;
pub use redis_store::RedisUsageStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to connect to usage store: {0}")]
    Connection(String),

    #[error("Usage store command failed: {0}")]
    Command(String),

    #[error("Invalid record TTL: {0}")]
    InvalidTtl(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// Atomic per-key counters with expiry
///
/// `reserve` and `release` must each be a single atomic step per key; callers
/// never read and write a counter in two separate operations.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Current count for `key`; absent or expired records count as zero
    async fn count(&self, key: &str, now: DateTime<Utc>) -> Result<u32, StoreError>;

    /// Increment `key` unless it already reached `limit`
    ///
    /// Returns the new count, or `None` when the limit was already reached (in
    /// which case nothing is written). A successful increment (re)sets the TTL.
    async fn reserve(
        &self,
        key: &str,
        limit: u32,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError>;

    /// Decrement `key`, never going below zero
    async fn release(&self, key: &str) -> Result<(), StoreError>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}
