//! Model exchange audit log

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::AiLogEntry;

use super::truncate;

pub fn cmd_logs(db: &Database, limit: i64) -> Result<Vec<AiLogEntry>> {
    let entries = db.list_ai_logs(limit.max(1))?;

    if entries.is_empty() {
        println!("No AI exchanges logged yet.");
        return Ok(entries);
    }

    for entry in &entries {
        let who = entry
            .user_id
            .map(|id| format!("user {}", id))
            .unwrap_or_else(|| "unknown user".to_string());
        println!(
            "#{} {} ({})",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            who
        );
        println!("   in:  {}", truncate(&entry.input_text, 100));
        println!("   out: {}", truncate(&entry.ai_output.replace('\n', " "), 100));
    }

    Ok(entries)
}
