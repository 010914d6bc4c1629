use axum::{extract::State, http::StatusCode, response::Json};
use ledger_guard_policy::RateLimitConfig;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    status: &'static str,
    database: &'static str,
    rate_limit: RateLimitConfig,
}

/// Readiness check endpoint
///
/// Probes the database with a user lookup.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let rate_limit = state.config.rate_limit;
    match state.directory.get_user("").await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                database: "connected",
                rate_limit,
            }),
        ),
        Err(e) => {
            tracing::error!("Readiness probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    database: "error",
                    rate_limit,
                }),
            )
        }
    }
}
