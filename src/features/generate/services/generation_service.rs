use std::sync::Arc;

use serde_json::{Map, Value};

use super::access_gate::{AccessDecision, AccessGate};
use crate::core::error::{AppError, Result};
use crate::features::usage::{ClientIdentity, ConsumeOutcome, UsageLimiter};
use crate::modules::provider::{ImageProvider, ProviderError, ProviderReply};
use crate::shared::constants::ACCESS_CODE_FIELD;

/// Runs one generation request through the access gate, the usage limiter
/// and the provider
pub struct GenerationService {
    gate: AccessGate,
    limiter: Arc<UsageLimiter>,
    provider: Arc<dyn ImageProvider>,
}

impl GenerationService {
    pub fn new(
        gate: AccessGate,
        limiter: Arc<UsageLimiter>,
        provider: Arc<dyn ImageProvider>,
    ) -> Self {
        Self {
            gate,
            limiter,
            provider,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.limiter.daily_limit()
    }

    /// Forward `payload` to the provider if the caller is authorized and has quota
    ///
    /// The provider's reply is returned as-is, whatever its status. Quota is only
    /// kept when the reply is a success carrying an inline image.
    pub async fn generate(
        &self,
        identity: &ClientIdentity,
        mut payload: Map<String, Value>,
    ) -> Result<ProviderReply> {
        let access_code = payload.remove(ACCESS_CODE_FIELD);
        if self.gate.verify(access_code.as_ref().and_then(Value::as_str)) == AccessDecision::Rejected
        {
            tracing::info!("Rejected access code from client {}", identity.digest());
            return Err(AppError::Forbidden("The access code is incorrect.".to_string()));
        }

        if !self.provider.is_configured() {
            return Err(ProviderError::NotConfigured.into());
        }

        let now = self.limiter.now();
        let reservation = match self.limiter.try_consume(identity, now).await? {
            ConsumeOutcome::Allowed(reservation) => reservation,
            ConsumeOutcome::LimitExceeded { daily_limit } => {
                return Err(AppError::QuotaExceeded(format!(
                    "The daily limit of {} generations has been reached. Please try again tomorrow.",
                    daily_limit
                )));
            }
        };

        let reply = match self.provider.generate(payload).await {
            Ok(reply) => reply,
            Err(e) => {
                reservation.release().await;
                return Err(e.into());
            }
        };

        if reply.is_success_with_image() {
            let day = reservation.day();
            let count = reservation.commit();
            let (mime_type, encoded_len) = reply
                .inline_image()
                .map(|image| (image.mime_type.unwrap_or("unknown type"), image.data.len()))
                .unwrap_or(("unknown type", 0));
            tracing::info!(
                "Generation succeeded for client {} ({}/{} on {}, {} {} bytes base64)",
                identity.digest(),
                count,
                self.limiter.daily_limit(),
                day,
                mime_type,
                encoded_len
            );
        } else {
            reservation.release().await;
            if reply.status.is_success() {
                tracing::warn!(
                    "Provider returned no image for client {}: {}",
                    identity.digest(),
                    reply.text().unwrap_or("no text part")
                );
            } else {
                tracing::warn!(
                    "Provider returned {} for client {}: {}",
                    reply.status,
                    identity.digest(),
                    reply.error_message().unwrap_or("no error message")
                );
            }
        }

        Ok(reply)
    }
}
