use axum::{Json, extract::Query};
use chrono::Utc;
use finewatch_types::{FinesResponse, HealthResponse, RawRecord};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::generator::generate_fines;

#[derive(Debug, Deserialize)]
pub struct FinesQuery {
    pub days: Option<String>,
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Mock fines API",
        "endpoints": {"fines": "/api/v3/fines?days=1", "health": "/health"},
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Always answers with 1–3 brand new fines; `days` is accepted for
/// compatibility and otherwise ignored.
pub async fn list_fines(Query(q): Query<FinesQuery>) -> Json<FinesResponse<RawRecord>> {
    let days: u32 = q.days.as_deref().and_then(|d| d.parse().ok()).unwrap_or(1);

    let mut rng = rand::rng();
    let count = rng.random_range(1..=3);
    let data = generate_fines(&mut rng, count);

    info!(count = data.len(), days, "Generated fines");
    Json(FinesResponse { data })
}
