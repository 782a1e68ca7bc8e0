use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{StoreError, UsageStore};

/// Expired entries are swept on writes once the map grows past this size
const PURGE_THRESHOLD: usize = 1024;

struct Entry {
    count: u32,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// In-process usage store, the default when no Redis URL is configured
///
/// Counters live behind one mutex, so each reserve/release is a single
/// critical section. Counts are lost on restart.
#[derive(Default)]
pub struct MemoryUsageStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn count(&self, key: &str, now: DateTime<Utc>) -> Result<u32, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.count)
            .unwrap_or(0))
    }

    async fn reserve(
        &self,
        key: &str,
        limit: u32,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| StoreError::InvalidTtl(e.to_string()))?;
        let mut entries = self.entries.lock().await;

        if entries.len() > PURGE_THRESHOLD {
            let before = entries.len();
            entries.retain(|_, e| e.is_live(now));
            tracing::debug!("Purged {} expired usage records", before - entries.len());
        }

        let current = entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.count)
            .unwrap_or(0);

        if current >= limit {
            return Ok(None);
        }

        let updated = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                count: updated,
                expires_at: now + ttl,
            },
        );

        Ok(Some(updated))
    }

    async fn release(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.count = entry.count.saturating_sub(1);
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
