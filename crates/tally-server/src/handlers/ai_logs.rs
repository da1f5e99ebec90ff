//! AI exchange audit log

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use tally_core::models::{AiLogEntry, Caller};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};

#[derive(Debug, Deserialize)]
pub struct AiLogQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    100
}

/// GET /api/ai/logs - Recent model exchanges (admins only)
pub async fn list_ai_logs(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<AiLogQuery>,
) -> Result<Json<Vec<AiLogEntry>>, AppError> {
    if !caller.role.is_privileged() {
        return Err(AppError::forbidden("admin role required"));
    }

    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_ai_logs(limit)?))
}
