mod usage_dto;

pub use usage_dto::UsageStatusDto;
