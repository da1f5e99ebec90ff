//! Canonical purchase filter and the role-scoped builder

use chrono::NaiveDate;
use serde::Serialize;

use crate::envelope::{FilterRequest, RequestContext};
use crate::models::Caller;
use crate::policy;

/// A typed purchase query, built once per request
///
/// All present constraints are combined with AND. Empty lists and `None`
/// bounds do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurchaseFilter {
    /// Owners to include; empty means every owner
    pub user_ids: Vec<i64>,
    pub categories: Vec<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// Inclusive, compared against the calendar date of `purchase_time`
    pub from_date: Option<NaiveDate>,
    /// Inclusive, compared against the calendar date of `purchase_time`
    pub to_date: Option<NaiveDate>,
}

impl PurchaseFilter {
    /// A filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to these owners
    pub fn user_ids(mut self, ids: Vec<i64>) -> Self {
        self.user_ids = ids;
        self
    }

    /// Restrict to these categories
    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Set amount bounds
    pub fn amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// Set date bounds
    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from_date = from;
        self.to_date = to;
        self
    }

    /// Whether this filter places no constraint at all
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }
}

/// Build a [`PurchaseFilter`] from the model's request, scoped to the caller
///
/// The model's `user_role` is ignored; visibility comes from the caller's
/// authenticated role alone. Pure and deterministic.
pub fn build_filter(
    filters: &FilterRequest,
    context: &RequestContext,
    caller: &Caller,
) -> PurchaseFilter {
    PurchaseFilter::new()
        .user_ids(policy::allowed_user_ids(caller, &context.target_users))
        .categories(filters.categories.clone())
        .amount_range(filters.min_amount, filters.max_amount)
        .date_range(filters.from_date, filters.to_date)
}
