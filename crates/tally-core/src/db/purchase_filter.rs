//! SQL rendering for purchase filters
//!
//! Turns a [`PurchaseFilter`] into a WHERE clause plus bound parameters, so
//! count, sum, top-category and list queries all share one definition of
//! "matching purchases".

use crate::filter::PurchaseFilter;

/// Result of rendering a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: &'static str,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

/// Columns selected for a full purchase row, in `row_to_purchase` order
pub(crate) const PURCHASE_COLUMNS: &str = "p.id, p.user_id, p.title, p.amount, p.currency, \
    p.category, p.subcategory, p.vendor, p.necessity, p.emotional_tone, p.reason_guess, \
    p.confidence, p.purchase_time, p.status, p.created_at";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl PurchaseFilter {
    /// Render the filter as SQL components
    pub fn to_sql(&self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        // Owner scope
        if !self.user_ids.is_empty() {
            conditions.push(format!(
                "p.user_id IN ({})",
                placeholders(self.user_ids.len())
            ));
            for id in &self.user_ids {
                params.push(Box::new(*id));
            }
        }

        // Exact match, same as GROUP BY in the top-category query
        if !self.categories.is_empty() {
            conditions.push(format!(
                "p.category IN ({})",
                placeholders(self.categories.len())
            ));
            for category in &self.categories {
                params.push(Box::new(category.clone()));
            }
        }

        if let Some(min) = self.min_amount {
            conditions.push("p.amount >= ?".to_string());
            params.push(Box::new(min));
        }

        if let Some(max) = self.max_amount {
            conditions.push("p.amount <= ?".to_string());
            params.push(Box::new(max));
        }

        // Date bounds are inclusive and compare calendar dates
        if let Some(from) = self.from_date {
            conditions.push("date(p.purchase_time) >= ?".to_string());
            params.push(Box::new(from.to_string()));
        }

        if let Some(to) = self.to_date {
            conditions.push("date(p.purchase_time) <= ?".to_string());
            params.push(Box::new(to.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        FilterResult {
            where_clause,
            order_clause: "ORDER BY p.purchase_time DESC, p.id DESC",
            params,
        }
    }
}

impl FilterResult {
    /// Build a SELECT of full purchase rows, newest first
    pub fn build_select_query(&self) -> String {
        format!(
            "SELECT {} FROM purchases p {} {}",
            PURCHASE_COLUMNS, self.where_clause, self.order_clause
        )
    }

    /// Build a COUNT query
    pub fn build_count_query(&self) -> String {
        format!("SELECT COUNT(*) FROM purchases p {}", self.where_clause)
    }

    /// Build a SUM query (0 when nothing matches)
    pub fn build_sum_query(&self) -> String {
        format!(
            "SELECT COALESCE(SUM(p.amount), 0.0) FROM purchases p {}",
            self.where_clause
        )
    }

    /// Build a query for the category with the largest summed amount
    ///
    /// Ties go to the category whose first matching purchase was stored
    /// earliest.
    pub fn build_top_category_query(&self) -> String {
        format!(
            r#"
            SELECT p.category, SUM(p.amount) AS total
            FROM purchases p
            {}
            GROUP BY p.category
            ORDER BY total DESC, MIN(p.id) ASC
            LIMIT 1
            "#,
            self.where_clause
        )
    }

    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Take the parameter vector to append extra params (e.g. LIMIT)
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}
