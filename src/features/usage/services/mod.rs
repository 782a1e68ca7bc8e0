mod usage_limiter;

pub use usage_limiter::{ConsumeOutcome, Reservation, UsageLimiter};
