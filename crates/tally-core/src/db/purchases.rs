//! Purchase storage and aggregate queries

use rusqlite::{params, OptionalExtension};

use super::purchase_filter::PURCHASE_COLUMNS;
use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::filter::PurchaseFilter;
use crate::models::{NewPurchase, Purchase, PurchaseStatus, TopCategory};

impl Database {
    /// Insert a purchase and return the stored row
    pub fn insert_purchase(&self, purchase: &NewPurchase) -> Result<Purchase> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO purchases (
                user_id, title, amount, currency, category, subcategory, vendor,
                necessity, emotional_tone, reason_guess, confidence, purchase_time, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                purchase.user_id,
                purchase.title,
                purchase.amount,
                purchase.currency,
                purchase.category,
                purchase.subcategory,
                purchase.vendor,
                purchase.necessity.map(|n| n.as_str()),
                purchase.emotional_tone,
                purchase.reason_guess,
                purchase.confidence,
                format_datetime(&purchase.purchase_time),
                purchase.status.as_str(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_purchase(id)?
            .ok_or_else(|| Error::NotFound(format!("purchase {} after insert", id)))
    }

    /// Get a purchase by ID
    pub fn get_purchase(&self, id: i64) -> Result<Option<Purchase>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM purchases p WHERE p.id = ?", PURCHASE_COLUMNS);

        let purchase = conn
            .query_row(&sql, params![id], Self::row_to_purchase)
            .optional()?;
        Ok(purchase)
    }

    /// List every purchase matching the filter, newest first
    pub fn list_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<Purchase>> {
        let conn = self.conn()?;
        let result = filter.to_sql();
        let sql = result.build_select_query();

        let mut stmt = conn.prepare(&sql)?;
        let purchases = stmt
            .query_map(result.params_refs().as_slice(), Self::row_to_purchase)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(purchases)
    }

    /// List the newest `limit` purchases matching the filter
    pub fn recent_purchases(&self, filter: &PurchaseFilter, limit: i64) -> Result<Vec<Purchase>> {
        let conn = self.conn()?;
        let result = filter.to_sql();
        let sql = format!("{} LIMIT ?", result.build_select_query());

        let mut params = result.into_params();
        params.push(Box::new(limit));
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let purchases = stmt
            .query_map(params_refs.as_slice(), Self::row_to_purchase)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(purchases)
    }

    /// Count purchases matching the filter
    pub fn count_purchases(&self, filter: &PurchaseFilter) -> Result<i64> {
        let conn = self.conn()?;
        let result = filter.to_sql();

        let count: i64 = conn.query_row(
            &result.build_count_query(),
            result.params_refs().as_slice(),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum amounts of purchases matching the filter (0 when none match)
    pub fn sum_purchases(&self, filter: &PurchaseFilter) -> Result<f64> {
        let conn = self.conn()?;
        let result = filter.to_sql();

        let total: f64 = conn.query_row(
            &result.build_sum_query(),
            result.params_refs().as_slice(),
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Category with the largest summed amount under the filter
    ///
    /// Returns an empty category and zero total when nothing matches.
    pub fn top_category(&self, filter: &PurchaseFilter) -> Result<TopCategory> {
        let conn = self.conn()?;
        let result = filter.to_sql();

        let top = conn
            .query_row(
                &result.build_top_category_query(),
                result.params_refs().as_slice(),
                |row| {
                    Ok(TopCategory {
                        category: row.get(0)?,
                        total: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(top.unwrap_or_default())
    }

    /// Helper to convert a row to Purchase
    /// Column order follows `PURCHASE_COLUMNS`
    pub(crate) fn row_to_purchase(row: &rusqlite::Row) -> rusqlite::Result<Purchase> {
        let necessity_str: Option<String> = row.get(8)?;
        let purchase_time_str: String = row.get(12)?;
        let status_str: String = row.get(13)?;
        let created_at_str: String = row.get(14)?;

        Ok(Purchase {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            amount: row.get(3)?,
            currency: row.get(4)?,
            category: row.get(5)?,
            subcategory: row.get(6)?,
            vendor: row.get(7)?,
            necessity: necessity_str.and_then(|s| s.parse().ok()),
            emotional_tone: row.get(9)?,
            reason_guess: row.get(10)?,
            confidence: row.get(11)?,
            purchase_time: parse_datetime(&purchase_time_str),
            status: status_str.parse().unwrap_or(PurchaseStatus::Confirmed),
            created_at: parse_datetime(&created_at_str),
        })
    }
}
