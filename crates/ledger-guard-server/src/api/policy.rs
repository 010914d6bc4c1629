use axum::{extract::State, http::StatusCode, response::Json};
use ledger_guard_policy::{AccessRequest, GatewayOutcome, PolicyEngine, Verdict};
use std::sync::Arc;

use crate::{error::ApiError, extractors::ApiJson, state::AppState};

/// Decide an access request without performing it
///
/// The request's snapshots are taken as given; denials are `200 OK`.
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AccessRequest>,
) -> Result<Json<Verdict>, ApiError> {
    let verdict = state.engine.evaluate(request).await?;
    Ok(Json(verdict))
}

/// Evaluate against the stored snapshot and carry out allowed operations
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AccessRequest>,
) -> Result<(StatusCode, Json<GatewayOutcome>), ApiError> {
    let outcome = state.gateway.submit(request).await?;
    let status = match outcome {
        GatewayOutcome::Conflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
