use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Public configuration disclosed by `GET /api/generate`
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateConfigDto {
    pub daily_limit: u32,
}

/// Shape of a generation request, for documentation
///
/// The handler forwards every field except `accessCode` to the provider
/// untouched, so fields beyond these are passed through as well.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct GenerateRequestDto {
    /// Shared access code
    pub access_code: String,
    /// Provider `contents`: the prompt text and the two inline images
    #[schema(value_type = Vec<Object>)]
    pub contents: Vec<Value>,
    /// Provider `generationConfig`, e.g. `{"responseModalities": ["IMAGE"]}`
    #[schema(value_type = Option<Object>)]
    pub generation_config: Option<Value>,
}
