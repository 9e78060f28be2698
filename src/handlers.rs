use crate::response::HealthResponse;
use crate::window::Outcome;
use axum::response::IntoResponse;
use axum::{Extension, Json};

/// Handler behind a rate limited route. The accounting outcome for the
/// current request is readable from the request extensions.
pub async fn limited(outcome: Option<Extension<Outcome>>) -> impl IntoResponse {
    let remaining = outcome.map(|Extension(outcome)| outcome.remaining);

    Json(serde_json::json!({
        "message": "within quota",
        "remaining": remaining,
    }))
}

pub async fn open() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "open route" }))
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}
