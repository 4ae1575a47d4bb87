//! Health, readiness and status endpoints.

use crate::store::ResultStore;
use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

/// Shared state for the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: ResultStore,
    /// Report ready while the license is in its grace period.
    pub fail_open: bool,
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(result) = state.store.latest().await else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "message": "No validation result yet" })),
        );
    };

    let valid = result.is_valid();
    if valid || (state.fail_open && result.in_grace_period) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "message": "License validation failed",
                "valid": valid,
            })),
        )
    }
}

async fn status_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.latest().await {
        Some(result) => match serde_json::to_value(result.snapshot()) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            ),
        },
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "no_validation_result",
                "message": "Validation has not run yet",
            })),
        ),
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}
