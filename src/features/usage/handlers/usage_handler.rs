use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::usage::dtos::UsageStatusDto;
use crate::features::usage::models::ClientIdentity;
use crate::features::usage::services::UsageLimiter;

/// Get the caller's remaining generations for today
#[utoipa::path(
    get,
    path = "/api/usage",
    responses(
        (status = 200, description = "Usage for the calling client", body = UsageStatusDto),
        (status = 500, description = "Usage store unavailable", body = crate::shared::types::ErrorResponse)
    ),
    tag = "usage"
)]
pub async fn get_usage_status(
    identity: ClientIdentity,
    State(limiter): State<Arc<UsageLimiter>>,
) -> Result<Json<UsageStatusDto>> {
    let status = limiter.status(&identity, limiter.now()).await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::shared::test_helpers::{
        generate_request, generation_body, image_reply, test_config, StubProvider, TestApp,
    };

    fn usage_request(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/usage")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_usage_for_new_client() {
        let app = TestApp::new(test_config(3), StubProvider::always(image_reply()));

        let (status, _, body) = app.send(usage_request("1.2.3.4")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "dailyLimit": 3,
                "used": 0,
                "remaining": 3,
                "day": "2025-06-01",
                "resetsAt": "2025-06-02T00:00:00Z"
            })
        );
    }

    #[tokio::test]
    async fn test_usage_tracks_successful_generations() {
        let app = TestApp::new(test_config(3), StubProvider::always(image_reply()));

        app.send(generate_request("1.2.3.4", generation_body("darumaya")))
            .await;
        let (_, _, body) = app.send(usage_request("1.2.3.4")).await;
        assert_eq!(body["used"], 1);
        assert_eq!(body["remaining"], 2);

        let (_, _, other) = app.send(usage_request("5.6.7.8")).await;
        assert_eq!(other["remaining"], 3);
    }

    #[tokio::test]
    async fn test_status_matches_limiter() {
        let app = TestApp::new(test_config(2), StubProvider::always(image_reply()));
        let identity = crate::features::usage::ClientIdentity::new("1.2.3.4");

        let status = tokio_test::assert_ok!(app.limiter.status(&identity, app.limiter.now()).await);
        assert_eq!(status.remaining, 2);
        assert_eq!(status.used, 0);
    }
}
