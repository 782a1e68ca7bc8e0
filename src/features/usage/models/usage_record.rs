use chrono::NaiveDate;

use super::ClientIdentity;
use crate::shared::constants::USAGE_KEY_PREFIX;

/// One client's consumption for one calendar day
///
/// Records are never deleted explicitly: the store expires them after their
/// TTL, and a missing record reads as `count = 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub client_identity: ClientIdentity,
    pub day: NaiveDate,
    pub count: u32,
}

impl UsageRecord {
    /// Store key for a `(client_identity, day)` pair
    pub fn storage_key(identity: &ClientIdentity, day: NaiveDate) -> String {
        format!(
            "{}:{}:{}",
            USAGE_KEY_PREFIX,
            identity.digest(),
            day.format("%Y-%m-%d")
        )
    }

    pub fn remaining(&self, daily_limit: u32) -> u32 {
        daily_limit.saturating_sub(self.count)
    }
}
