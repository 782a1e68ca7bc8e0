use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};

use super::{ImageProvider, ProviderError, ProviderReply};
use crate::core::config::ProviderConfig;

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl GeminiClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("TryOnGateway/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        )
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn generate(&self, payload: Map<String, Value>) -> Result<ProviderReply, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured)?;

        let url = self.endpoint();
        tracing::debug!("Calling provider model {}", self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Provider request failed: {:?}", e);
                ProviderError::Request(e.without_url().to_string())
            })?;

        // reqwest and axum share the `http` crate, so the status carries over as-is
        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| ProviderError::Parse(format!("Invalid status code: {}", e)))?;

        let body: Value = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse provider response (status {}): {:?}", status, e);
            ProviderError::Parse(e.without_url().to_string())
        })?;

        if !status.is_success() {
            tracing::warn!("Provider returned status: {}", status);
        }

        Ok(ProviderReply::new(status, body))
    }
}
