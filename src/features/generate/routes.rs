use std::sync::Arc;

use axum::{routing::get, Router};

use super::handlers::{generate, get_generate_config, method_not_allowed, preflight};
use super::services::GenerationService;

/// Create routes for the generate feature
pub fn routes(service: Arc<GenerationService>) -> Router {
    Router::new()
        .route(
            "/api/generate",
            get(get_generate_config)
                .post(generate)
                .options(preflight)
                // `get` would otherwise answer HEAD as well
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .with_state(service)
}
