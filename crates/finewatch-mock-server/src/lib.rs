//! Synthetic stand-in for the marketplace fines API, for local runs and
//! HTTP-level tests of the fetch client.

pub mod generator;
pub mod routes;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub fn router() -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/v3/fines", get(routes::list_fines))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use finewatch_types::{FinesResponse, HealthResponse};
    use tower::ServiceExt;

    async fn get_json<T: serde::de::DeserializeOwned>(uri: &str) -> (StatusCode, T) {
        let resp = router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body): (_, HealthResponse) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn fines_returns_one_to_three_records() {
        let (status, body): (_, FinesResponse) = get_json("/api/v3/fines?days=1").await;
        assert_eq!(status, StatusCode::OK);
        assert!((1..=3).contains(&body.data.len()));
    }

    #[tokio::test]
    async fn bad_days_param_is_tolerated() {
        let (status, body): (_, FinesResponse) = get_json("/api/v3/fines?days=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.data.is_empty());
    }
}
