use sha2::{Digest, Sha256};

use crate::shared::constants::IDENTITY_DIGEST_LEN;

/// Per-caller key that scopes the daily quota, derived from the network address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Truncated SHA-256 of the identity; used in storage keys and logs
    /// instead of the raw address
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        let mut encoded = hex::encode(hash);
        encoded.truncate(IDENTITY_DIGEST_LEN);
        encoded
    }
}
