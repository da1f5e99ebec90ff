//! Conversational purchase endpoint

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use tally_core::{Caller, DispatchOutcome, MessageDispatcher};

use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// POST /api/ai/message - Let the assistant add, list or analyze purchases
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("message is required"));
    }

    let ai = state
        .ai
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("AI backend not configured"))?;

    let outcome = MessageDispatcher::new(&state.db, ai)
        .handle_message(&caller, message)
        .await?;

    Ok(Json(outcome))
}
