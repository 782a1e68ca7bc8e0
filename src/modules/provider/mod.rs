//! Image-generation provider module
//!
//! The gateway forwards the caller's payload untouched and relays the
//! provider's status and body. Only the success check looks inside the body.

mod gemini_client;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::core::error::AppError;

pub use gemini_client::GeminiClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider API key is not configured")]
    NotConfigured,

    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured => AppError::Configuration(
                "The image generation API key is not configured. Check the server environment."
                    .to_string(),
            ),
            other => AppError::ExternalServiceError(other.to_string()),
        }
    }
}

/// Status and JSON body exactly as the provider returned them
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub status: StatusCode,
    pub body: Value,
}

/// An image part of a provider response
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage<'a> {
    pub mime_type: Option<&'a str>,
    pub data: &'a str,
}

impl ProviderReply {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    fn first_candidate_parts(&self) -> impl Iterator<Item = &Value> {
        self.body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    /// First inline image with non-empty data in the first candidate
    pub fn inline_image(&self) -> Option<InlineImage<'_>> {
        self.first_candidate_parts().find_map(|part| {
            let inline = part.get("inlineData")?;
            let data = inline.get("data")?.as_str().filter(|d| !d.is_empty())?;
            Some(InlineImage {
                mime_type: inline.get("mimeType").and_then(Value::as_str),
                data,
            })
        })
    }

    /// First text part, which carries the provider's explanation when no image came back
    pub fn text(&self) -> Option<&str> {
        self.first_candidate_parts()
            .find_map(|part| part.get("text").and_then(Value::as_str))
    }

    /// Provider-side error message, if the body is an error envelope
    pub fn error_message(&self) -> Option<&str> {
        self.body.pointer("/error/message").and_then(Value::as_str)
    }

    /// A generation only counts when the call succeeded and produced an image
    pub fn is_success_with_image(&self) -> bool {
        self.status.is_success() && self.inline_image().is_some()
    }
}

/// External multimodal image-generation service
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Whether a credential is available to call the provider
    fn is_configured(&self) -> bool;

    /// Forward `payload` verbatim and return the provider's answer
    ///
    /// Provider-side HTTP errors come back as a `ProviderReply` with that
    /// status; `Err` is reserved for transport and decoding failures.
    async fn generate(&self, payload: Map<String, Value>) -> Result<ProviderReply, ProviderError>;
}
