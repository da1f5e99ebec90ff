//! User accounts

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::credentials::hash_password;
use crate::error::{Error, Result};
use crate::models::{Role, User};

/// Username of the seeded administrator account
pub const ADMIN_USERNAME: &str = "admin";

impl Database {
    /// Create a user from an already-hashed password
    ///
    /// Fails with `Error::Conflict` if the username is taken.
    pub fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User> {
        if self.get_user_by_username(username)?.is_some() {
            return Err(Error::Conflict(format!("username '{}' is taken", username)));
        }

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)",
            params![username, password_hash, role.as_str()],
        );

        match inserted {
            Ok(_) => {}
            // Lost a race with a concurrent insert of the same username
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::Conflict(format!("username '{}' is taken", username)));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("user {} after insert", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, role, created_at FROM users WHERE id = ?",
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, role, created_at FROM users WHERE username = ?",
                params![username],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, role, created_at FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Create the `admin` account if it does not exist yet
    ///
    /// Returns true if the account was created.
    pub fn ensure_admin(&self, password: &str) -> Result<bool> {
        if self.get_user_by_username(ADMIN_USERNAME)?.is_some() {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        self.create_user(ADMIN_USERNAME, &hash, Role::Admin)?;
        info!("Seeded admin account");
        Ok(true)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role_str: String = row.get(3)?;
        let created_at_str: String = row.get(4)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role: role_str.parse().unwrap_or_default(),
            created_at: parse_datetime(&created_at_str),
        })
    }
}
