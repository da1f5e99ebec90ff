//! Audit trail of language model exchanges

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::AiLogEntry;

impl Database {
    /// Record the user's input and the model's raw output
    pub fn record_ai_log(
        &self,
        user_id: Option<i64>,
        input_text: &str,
        ai_output: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO ai_logs (user_id, input_text, ai_output) VALUES (?, ?, ?)",
            params![user_id, input_text, ai_output],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List AI log entries, newest first
    pub fn list_ai_logs(&self, limit: i64) -> Result<Vec<AiLogEntry>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, input_text, ai_output, created_at
            FROM ai_logs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                let created_at_str: String = row.get(4)?;
                Ok(AiLogEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    input_text: row.get(2)?,
                    ai_output: row.get(3)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
