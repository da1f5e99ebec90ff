//! Account management

use anyhow::{bail, Context, Result};
use tally_core::credentials::{hash_password, MIN_PASSWORD_LEN};
use tally_core::db::Database;
use tally_core::models::{Role, User};

/// Environment variable consulted when `--password` is not given
pub const NEW_PASSWORD_ENV: &str = "TALLY_NEW_PASSWORD";

/// Pick the password from the flag, falling back to TALLY_NEW_PASSWORD
pub fn resolve_new_password(flag: Option<String>) -> Result<String> {
    flag.or_else(|| std::env::var(NEW_PASSWORD_ENV).ok())
        .filter(|p| !p.is_empty())
        .with_context(|| format!("Pass --password or set {}", NEW_PASSWORD_ENV))
}

pub fn cmd_users_add(db: &Database, username: &str, password: &str, admin: bool) -> Result<User> {
    let username = username.trim();
    if username.chars().count() < 3 || username.chars().count() > 100 {
        bail!("Username must be 3-100 characters");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }

    let role = if admin { Role::Admin } else { Role::User };
    let hash = hash_password(password)?;
    let user = db.create_user(username, &hash, role)?;

    println!(
        "✅ Created {} '{}' (id {})",
        user.role, user.username, user.id
    );

    Ok(user)
}

pub fn cmd_users_list(db: &Database) -> Result<Vec<User>> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No accounts yet. Create one with: tally users add <name>");
        return Ok(users);
    }

    println!("{:<6} {:<24} {:<8} {}", "ID", "USERNAME", "ROLE", "CREATED");
    println!("{}", "-".repeat(60));
    for user in &users {
        println!(
            "{:<6} {:<24} {:<8} {}",
            user.id,
            user.username,
            user.role,
            user.created_at.format("%Y-%m-%d")
        );
    }

    Ok(users)
}
