use utoipa::{Modify, OpenApi};

use crate::features::generate::{dtos as generate_dtos, handlers as generate_handlers};
use crate::features::usage::{dtos as usage_dtos, handlers as usage_handlers};
use crate::shared::types::{ErrorBody, ErrorResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Generate
        generate_handlers::get_generate_config,
        generate_handlers::generate,
        generate_handlers::preflight,
        // Usage
        usage_handlers::get_usage_status,
    ),
    components(
        schemas(
            ErrorResponse,
            ErrorBody,
            generate_dtos::GenerateConfigDto,
            generate_dtos::GenerateRequestDto,
            usage_dtos::UsageStatusDto,
        )
    ),
    tags(
        (name = "generate", description = "Access-gated, quota-metered image generation"),
        (name = "usage", description = "Daily generation quota of the calling client"),
    ),
    info(
        title = "Try-On Gateway API",
        version = "0.1.0",
        description = "Access-gated, quota-metered image generation proxy",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
