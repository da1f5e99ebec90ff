//! Purchase listing

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use tally_core::models::{Caller, Purchase};
use tally_core::policy::allowed_user_ids;
use tally_core::PurchaseFilter;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};

#[derive(Debug, Deserialize)]
pub struct PurchaseQuery {
    /// Owner to list (honored for admins only)
    pub user_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Serialize)]
pub struct PurchaseListResponse {
    pub purchases: Vec<Purchase>,
    pub total: i64,
}

/// GET /api/purchases - Newest purchases visible to the caller
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<PurchaseQuery>,
) -> Result<Json<PurchaseListResponse>, AppError> {
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let requested: Vec<i64> = params.user_id.into_iter().collect();
    let filter = PurchaseFilter::new().user_ids(allowed_user_ids(&caller, &requested));

    let total = state.db.count_purchases(&filter)?;
    let purchases = state.db.recent_purchases(&filter, limit)?;

    Ok(Json(PurchaseListResponse { purchases, total }))
}
