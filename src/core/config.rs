use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub access: AccessConfig,
    pub usage: UsageConfig,
    pub provider: ProviderConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
    /// Directory with the front-end bundle, served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

/// Shared secret every generation request must present
#[derive(Clone)]
pub struct AccessConfig {
    pub access_code: String,
}

/// Daily quota settings, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct UsageConfig {
    /// Maximum successful generations per client identity per day
    pub daily_limit: u32,
    /// Offset of the timezone that defines a calendar day
    pub utc_offset: FixedOffset,
    /// Lifetime of a usage record after its last write
    pub record_ttl: Duration,
    /// Redis connection URL; the in-process store is used when absent
    pub redis_url: Option<String>,
}

/// External image-generation provider settings
#[derive(Clone)]
pub struct ProviderConfig {
    /// `None` when the key is unset, empty or still the placeholder value
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, String> {
        Ok(Config {
            app: AppConfig::from_lookup(lookup)?,
            access: AccessConfig::from_lookup(lookup),
            usage: UsageConfig::from_lookup(lookup)?,
            provider: ProviderConfig::from_lookup(lookup)?,
            swagger: SwaggerConfig::from_lookup(lookup),
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 50 * 1024 * 1024; // 50MB, two base64 photos

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, String> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let max_request_body_size = lookup("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        let static_dir = lookup("STATIC_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            max_request_body_size,
            static_dir,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AccessConfig {
    pub const DEFAULT_ACCESS_CODE: &'static str = "darumaya";

    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        // An empty value counts as unset
        let access_code = lookup("ACCESS_CODE")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_ACCESS_CODE.to_string());

        Self { access_code }
    }
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("access_code", &"***")
            .finish()
    }
}

impl UsageConfig {
    pub const DEFAULT_DAILY_LIMIT: u32 = 3;
    const DEFAULT_UTC_OFFSET_HOURS: i32 = 0;
    const DEFAULT_RECORD_TTL_SECS: u64 = 24 * 60 * 60;

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, String> {
        let daily_limit = lookup("DAILY_LIMIT")
            .unwrap_or_else(|| Self::DEFAULT_DAILY_LIMIT.to_string())
            .parse::<u32>()
            .map_err(|_| "DAILY_LIMIT must be a non-negative integer".to_string())?;

        let offset_hours = lookup("USAGE_UTC_OFFSET_HOURS")
            .unwrap_or_else(|| Self::DEFAULT_UTC_OFFSET_HOURS.to_string())
            .parse::<i32>()
            .map_err(|_| "USAGE_UTC_OFFSET_HOURS must be a valid number".to_string())?;
        let utc_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| "USAGE_UTC_OFFSET_HOURS must be between -23 and 23".to_string())?;

        let record_ttl_secs = lookup("USAGE_RECORD_TTL_SECS")
            .unwrap_or_else(|| Self::DEFAULT_RECORD_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "USAGE_RECORD_TTL_SECS must be a valid number".to_string())?;
        if record_ttl_secs == 0 {
            return Err("USAGE_RECORD_TTL_SECS must be greater than zero".to_string());
        }

        let redis_url = lookup("REDIS_URL").filter(|s| !s.is_empty());

        Ok(Self {
            daily_limit,
            utc_offset,
            record_ttl: Duration::from_secs(record_ttl_secs),
            redis_url,
        })
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            daily_limit: Self::DEFAULT_DAILY_LIMIT,
            utc_offset: Utc.fix(),
            record_ttl: Duration::from_secs(Self::DEFAULT_RECORD_TTL_SECS),
            redis_url: None,
        }
    }
}

impl ProviderConfig {
    const PLACEHOLDER_API_KEY: &'static str = "your_api_key_here";
    const DEFAULT_MODEL: &'static str = "gemini-3-pro-image-preview";
    const DEFAULT_API_BASE: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    const DEFAULT_TIMEOUT_SECS: u64 = 120;

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, String> {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != Self::PLACEHOLDER_API_KEY);

        let model = lookup("GEMINI_MODEL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        let api_base = lookup("GEMINI_API_BASE")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = lookup("GEMINI_TIMEOUT_SECS")
            .unwrap_or_else(|| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "GEMINI_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            api_key,
            model,
            api_base,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SwaggerConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        // Only use credentials if they are non-empty
        let username = lookup("SWAGGER_USERNAME").filter(|s| !s.is_empty());
        let password = lookup("SWAGGER_PASSWORD").filter(|s| !s.is_empty());
        let title = lookup("SWAGGER_TITLE").unwrap_or_else(|| "Try-On Gateway API".to_string());
        let version = lookup("SWAGGER_VERSION").unwrap_or_else(|| "0.1.0".to_string());
        let description = lookup("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|| "Access-gated, quota-metered image generation proxy".to_string());

        Self {
            username,
            password,
            title,
            version,
            description,
        }
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}
