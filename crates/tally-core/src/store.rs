//! Storage interface used by the message dispatcher

use crate::db::Database;
use crate::error::Result;
use crate::filter::PurchaseFilter;
use crate::models::{NewPurchase, Purchase, TopCategory};

/// Purchase persistence as seen by the dispatcher
///
/// Each call is independently atomic; no transaction spans calls.
pub trait PurchaseStore: Send + Sync {
    fn insert_purchase(&self, purchase: &NewPurchase) -> Result<Purchase>;

    /// Every matching purchase, newest first
    fn list_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<Purchase>>;

    fn count_purchases(&self, filter: &PurchaseFilter) -> Result<i64>;

    fn sum_purchases(&self, filter: &PurchaseFilter) -> Result<f64>;

    fn top_category(&self, filter: &PurchaseFilter) -> Result<TopCategory>;

    fn record_ai_log(&self, user_id: Option<i64>, input_text: &str, ai_output: &str)
        -> Result<i64>;
}

impl PurchaseStore for Database {
    fn insert_purchase(&self, purchase: &NewPurchase) -> Result<Purchase> {
        Database::insert_purchase(self, purchase)
    }

    fn list_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<Purchase>> {
        Database::list_purchases(self, filter)
    }

    fn count_purchases(&self, filter: &PurchaseFilter) -> Result<i64> {
        Database::count_purchases(self, filter)
    }

    fn sum_purchases(&self, filter: &PurchaseFilter) -> Result<f64> {
        Database::sum_purchases(self, filter)
    }

    fn top_category(&self, filter: &PurchaseFilter) -> Result<TopCategory> {
        Database::top_category(self, filter)
    }

    fn record_ai_log(
        &self,
        user_id: Option<i64>,
        input_text: &str,
        ai_output: &str,
    ) -> Result<i64> {
        Database::record_ai_log(self, user_id, input_text, ai_output)
    }
}
