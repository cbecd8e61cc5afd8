use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Liveness probe
///
/// Always returns 200 OK if the service is running.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe
///
/// Returns 503 Service Unavailable when the database does not answer.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status) = match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "database readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let response = HealthResponse {
        status: status.to_string(),
        service: state.config().service.name.clone(),
        version: None,
    };
    (code, Json(response))
}
