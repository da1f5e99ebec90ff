//! Current caller

use axum::{Extension, Json};
use serde::Serialize;

use tally_core::models::Caller;

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

/// GET /api/me - Identity carried by the bearer token
pub async fn get_me(Extension(caller): Extension<Caller>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: caller.user_id,
        username: caller.username,
        role: caller.role.as_str().to_string(),
    })
}
