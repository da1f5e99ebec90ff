//! Purchase listing

use anyhow::Result;
use tally_core::db::Database;
use tally_core::filter::PurchaseFilter;
use tally_core::models::Purchase;

use super::truncate;

/// Print the newest purchases, optionally for one owner
pub fn cmd_purchases(db: &Database, user_id: Option<i64>, limit: i64) -> Result<Vec<Purchase>> {
    let filter = PurchaseFilter::new().user_ids(user_id.into_iter().collect());
    let purchases = db.recent_purchases(&filter, limit.max(1))?;

    if purchases.is_empty() {
        println!("No purchases recorded.");
        return Ok(purchases);
    }

    println!(
        "{:<6} {:<6} {:<12} {:<28} {:>10} {:<4} {}",
        "ID", "USER", "DATE", "TITLE", "AMOUNT", "CCY", "CATEGORY"
    );
    println!("{}", "-".repeat(84));

    for p in &purchases {
        println!(
            "{:<6} {:<6} {:<12} {:<28} {:>10.2} {:<4} {}",
            p.id,
            p.user_id,
            p.purchase_time.format("%Y-%m-%d"),
            truncate(&p.title, 28),
            p.amount,
            p.currency,
            if p.category.is_empty() {
                "-"
            } else {
                p.category.as_str()
            }
        );
    }

    let total = db.count_purchases(&filter)?;
    let sum = db.sum_purchases(&filter)?;
    println!();
    println!(
        "Showing {} of {} purchases (total {:.2})",
        purchases.len(),
        total,
        sum
    );

    Ok(purchases)
}
