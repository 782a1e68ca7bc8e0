use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use crate::core::config::{
    AccessConfig, AppConfig, Config, ProviderConfig, SwaggerConfig, UsageConfig,
};
use crate::core::router::{build_router, AppServices};
use crate::features::generate::{AccessGate, GenerationService};
use crate::features::usage::UsageLimiter;
use crate::modules::provider::{ImageProvider, ProviderError, ProviderReply};
use crate::modules::usage_store::MemoryUsageStore;
use crate::shared::clock::Clock;

// =============================================================================
// CLOCK
// =============================================================================

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

pub fn image_reply() -> ProviderReply {
    ProviderReply::new(
        StatusCode::OK,
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgoAAAANSUhEUg==" } }]
                },
                "finishReason": "STOP"
            }]
        }),
    )
}

pub fn text_reply(text: &str) -> ProviderReply {
    ProviderReply::new(
        StatusCode::OK,
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }),
    )
}

enum Behavior {
    Always(ProviderReply),
    Sequence(Mutex<VecDeque<ProviderReply>>),
    Failing(fn() -> ProviderError),
}

/// Provider double that records every forwarded payload
pub struct StubProvider {
    configured: bool,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Mutex<Vec<Map<String, Value>>>,
}

impl StubProvider {
    fn with(behavior: Behavior) -> Self {
        Self {
            configured: true,
            behavior,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: ProviderReply) -> Self {
        Self::with(Behavior::Always(reply))
    }

    pub fn sequence(replies: Vec<ProviderReply>) -> Self {
        Self::with(Behavior::Sequence(Mutex::new(replies.into())))
    }

    pub fn failing(error: fn() -> ProviderError) -> Self {
        Self::with(Behavior::Failing(error))
    }

    /// Provider without a credential
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::always(image_reply())
        }
    }

    /// Hold every call for `delay` before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Map<String, Value>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageProvider for StubProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, payload: Map<String, Value>) -> Result<ProviderReply, ProviderError> {
        self.calls.lock().unwrap().push(payload);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Always(reply) => Ok(reply.clone()),
            Behavior::Sequence(replies) => Ok(replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("stub provider ran out of replies")),
            Behavior::Failing(error) => Err(error()),
        }
    }
}

// =============================================================================
// APP
// =============================================================================

pub fn test_config(daily_limit: u32) -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_request_body_size: 1024 * 1024,
            static_dir: None,
        },
        access: AccessConfig {
            access_code: "darumaya".to_string(),
        },
        usage: UsageConfig {
            daily_limit,
            ..UsageConfig::default()
        },
        provider: ProviderConfig {
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(1),
        },
        swagger: SwaggerConfig {
            username: None,
            password: None,
            title: "Test".to_string(),
            version: "0.0.0".to_string(),
            description: "Test".to_string(),
        },
    }
}

/// Fully wired router around a stub provider and an in-memory store
pub struct TestApp {
    pub router: Router,
    pub limiter: Arc<UsageLimiter>,
    pub provider: Arc<StubProvider>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new(config: Config, provider: StubProvider) -> Self {
        let clock = Arc::new(ManualClock::default());
        let limiter = Arc::new(UsageLimiter::new(
            Arc::new(MemoryUsageStore::new()),
            config.usage.clone(),
            clock.clone(),
        ));
        let provider = Arc::new(provider);
        let generation = Arc::new(GenerationService::new(
            AccessGate::new(&config.access),
            Arc::clone(&limiter),
            provider.clone(),
        ));

        let router = build_router(
            AppServices {
                generation,
                limiter: Arc::clone(&limiter),
            },
            &config,
        );

        Self {
            router,
            limiter,
            provider,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, headers, body)
    }

    pub async fn remaining(&self, ip: &str) -> u32 {
        self.limiter
            .remaining(
                &crate::features::usage::ClientIdentity::new(ip),
                self.clock.now(),
            )
            .await
            .unwrap()
    }
}

pub fn generate_request(ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn generation_body(access_code: &str) -> Value {
    json!({
        "accessCode": access_code,
        "contents": [{
            "parts": [
                { "text": "Combine the portrait with the garment." },
                { "inlineData": { "mimeType": "image/jpeg", "data": "cG9ydHJhaXQ=" } },
                { "inlineData": { "mimeType": "image/jpeg", "data": "Z2FybWVudA==" } }
            ]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": "2:3", "imageSize": "2K" }
        }
    })
}
