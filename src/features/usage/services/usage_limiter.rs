use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::core::config::UsageConfig;
use crate::core::error::Result;
use crate::features::usage::dtos::UsageStatusDto;
use crate::features::usage::models::{ClientIdentity, UsageRecord};
use crate::modules::usage_store::UsageStore;
use crate::shared::clock::Clock;

/// Result of asking for one generation's worth of quota
pub enum ConsumeOutcome {
    /// A unit is held for this request; settle it with `commit` or `release`
    Allowed(Reservation),
    LimitExceeded { daily_limit: u32 },
}

/// One unit of quota held while the provider call is in flight
///
/// The day key is fixed when the reservation is taken, so settling always
/// targets the day the request was checked against, even across midnight.
/// Dropping an unsettled reservation (e.g. the request future was cancelled)
/// releases it on the runtime.
pub struct Reservation {
    store: Arc<dyn UsageStore>,
    key: String,
    day: NaiveDate,
    count: u32,
    settled: bool,
}

impl Reservation {
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Keep the unit; returns the committed count
    pub fn commit(mut self) -> u32 {
        self.settled = true;
        self.count
    }

    /// Give the unit back
    pub async fn release(mut self) {
        self.settled = true;
        if let Err(e) = self.store.release(&self.key).await {
            tracing::warn!("Failed to release usage reservation {}: {}", self.key, e);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Releasing abandoned usage reservation {}", key);
                handle.spawn(async move {
                    if let Err(e) = store.release(&key).await {
                        tracing::warn!("Failed to release abandoned reservation {}: {}", key, e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!("No runtime to release abandoned reservation {}", key);
            }
        }
    }
}

/// Per-client, per-day generation counter with a fixed daily ceiling
///
/// Quota is reserved before the provider call and only kept when the call
/// produced an image, so the stored count never exceeds the limit even under
/// concurrent requests from the same client.
pub struct UsageLimiter {
    store: Arc<dyn UsageStore>,
    config: UsageConfig,
    clock: Arc<dyn Clock>,
}

impl UsageLimiter {
    pub fn new(store: Arc<dyn UsageStore>, config: UsageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.config.daily_limit
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Calendar day of `now` in the configured timezone
    pub fn day_of(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.config.utc_offset).date_naive()
    }

    /// Start of the next calendar day, in UTC
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let day = self.day_of(now);
        day.succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN))
            .and_then(|midnight| {
                self.config
                    .utc_offset
                    .from_local_datetime(&midnight)
                    .single()
            })
            .map(|reset| reset.with_timezone(&Utc))
            .unwrap_or_else(|| now + Duration::days(1))
    }

    async fn record(&self, identity: &ClientIdentity, now: DateTime<Utc>) -> Result<UsageRecord> {
        let day = self.day_of(now);
        let key = UsageRecord::storage_key(identity, day);
        let count = self.store.count(&key, now).await?;

        Ok(UsageRecord {
            client_identity: identity.clone(),
            day,
            count,
        })
    }

    /// `max(0, daily_limit - count)` for today's record
    pub async fn remaining(&self, identity: &ClientIdentity, now: DateTime<Utc>) -> Result<u32> {
        let record = self.record(identity, now).await?;
        Ok(record.remaining(self.config.daily_limit))
    }

    pub async fn status(
        &self,
        identity: &ClientIdentity,
        now: DateTime<Utc>,
    ) -> Result<UsageStatusDto> {
        let record = self.record(identity, now).await?;
        let daily_limit = self.config.daily_limit;

        Ok(UsageStatusDto {
            daily_limit,
            used: record.count.min(daily_limit),
            remaining: record.remaining(daily_limit),
            day: record.day,
            resets_at: self.next_reset(now),
        })
    }

    /// Atomically reserve one unit for today, or report the limit
    pub async fn try_consume(
        &self,
        identity: &ClientIdentity,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome> {
        let day = self.day_of(now);
        let key = UsageRecord::storage_key(identity, day);
        let daily_limit = self.config.daily_limit;

        let reserved = self
            .store
            .reserve(&key, daily_limit, self.config.record_ttl, now)
            .await?;

        match reserved {
            Some(count) => {
                tracing::debug!(
                    "Reserved usage {}/{} for client {} on {}",
                    count,
                    daily_limit,
                    identity.digest(),
                    day
                );
                Ok(ConsumeOutcome::Allowed(Reservation {
                    store: Arc::clone(&self.store),
                    key,
                    day,
                    count,
                    settled: false,
                }))
            }
            None => {
                tracing::info!(
                    "Daily limit of {} reached for client {} on {}",
                    daily_limit,
                    identity.digest(),
                    day
                );
                Ok(ConsumeOutcome::LimitExceeded { daily_limit })
            }
        }
    }
}
