use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Caller's quota for the current day
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatusDto {
    /// Maximum successful generations per day
    pub daily_limit: u32,
    /// Generations already counted today
    pub used: u32,
    /// Generations left today
    pub remaining: u32,
    /// Calendar day the counts apply to
    pub day: NaiveDate,
    /// When the count resets (next local midnight, in UTC)
    pub resets_at: DateTime<Utc>,
}
