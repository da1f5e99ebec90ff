//! Shared types for AI backends
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::{Deserialize, Serialize};

use crate::envelope::FilterRequest;

/// Server-computed numbers handed to the summarizer
///
/// Serialized with snake_case keys; the same object is returned to the
/// client next to the summary text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsPayload {
    pub total_amount: f64,
    pub top_category: String,
    pub top_category_total: f64,
    pub purchase_count: i64,
    /// The filter constraints the model asked for
    pub filters: FilterRequest,
}

/// Natural-language rendering of an [`AnalyticsPayload`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Text shown to the user
    pub text: String,
    /// Full response body from the summarizer
    pub raw: String,
}

/// Backend identity, for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    pub kind: String,
    pub model: String,
    pub host: String,
}
