mod client_identity;
mod usage_record;

pub use client_identity::ClientIdentity;
pub use usage_record::UsageRecord;
