use axum::{
    extract::{Path, State},
    response::Json,
};
use ledger_guard_policy::{Role, UserRecord};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::ApiError, extractors::ApiJson, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub role: Role,
}

/// Provision a principal's user record
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Path(principal_id): Path<String>,
    ApiJson(request): ApiJson<UpsertUserRequest>,
) -> Result<Json<UserRecord>, ApiError> {
    let record = UserRecord {
        id: principal_id,
        role: request.role,
    };
    state.directory.upsert_user(&record).await?;
    tracing::info!(principal_id = %record.id, role = ?record.role, "Provisioned user");
    Ok(Json(record))
}
