use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{Map, Value};

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::generate::dtos::{GenerateConfigDto, GenerateRequestDto};
use crate::features::generate::services::GenerationService;
use crate::features::usage::ClientIdentity;
use crate::shared::types::ErrorResponse;

/// Disclose the daily generation limit
#[utoipa::path(
    get,
    path = "/api/generate",
    responses(
        (status = 200, description = "Public generation settings", body = GenerateConfigDto)
    ),
    tag = "generate"
)]
pub async fn get_generate_config(
    State(service): State<Arc<GenerationService>>,
) -> Json<GenerateConfigDto> {
    Json(GenerateConfigDto {
        daily_limit: service.daily_limit(),
    })
}

/// Generate a try-on image
///
/// Everything except `accessCode` is forwarded to the provider, and the
/// provider's status and body are relayed unchanged.
#[utoipa::path(
    post,
    path = "/api/generate",
    request_body = GenerateRequestDto,
    responses(
        (status = 200, description = "Provider response, relayed unchanged"),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 403, description = "Missing or incorrect access code", body = ErrorResponse),
        (status = 429, description = "Daily limit reached", body = ErrorResponse),
        (status = 500, description = "Provider credential missing or provider unreachable", body = ErrorResponse)
    ),
    tag = "generate"
)]
pub async fn generate(
    identity: ClientIdentity,
    State(service): State<Arc<GenerationService>>,
    AppJson(payload): AppJson<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>)> {
    let reply = service.generate(&identity, payload).await?;
    Ok((reply.status, Json(reply.body)))
}

/// CORS preflight
#[utoipa::path(
    options,
    path = "/api/generate",
    responses((status = 200, description = "Empty preflight response")),
    tag = "generate"
)]
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
