use std::sync::Arc;

use axum::{routing::get, Router};

use super::handlers::get_usage_status;
use super::services::UsageLimiter;

/// Create routes for the usage feature
pub fn routes(limiter: Arc<UsageLimiter>) -> Router {
    Router::new()
        .route("/api/usage", get(get_usage_status))
        .with_state(limiter)
}
