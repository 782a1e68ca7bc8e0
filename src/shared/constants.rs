/// JSON field carrying the shared access code on generation requests
pub const ACCESS_CODE_FIELD: &str = "accessCode";

/// Prefix for usage record keys in the usage store
pub const USAGE_KEY_PREFIX: &str = "usage";

/// Number of hex characters of the identity digest kept in storage keys
pub const IDENTITY_DIGEST_LEN: usize = 16;

// =============================================================================
// CLIENT IDENTITY HEADERS
// =============================================================================

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub const X_REAL_IP: &str = "x-real-ip";

/// Identity used when no address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

// =============================================================================
// CORS
// =============================================================================

pub const CORS_ALLOW_ORIGIN: &str = "*";

pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";

pub const CORS_ALLOW_HEADERS: &str = "Content-Type";
