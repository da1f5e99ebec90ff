//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `seed_admin_from_env` - Create the admin account from TALLY_ADMIN_PASSWORD

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::credentials::MIN_PASSWORD_LEN;
use tally_core::db::{Database, ADMIN_USERNAME};
use tracing::warn;

/// Environment variable holding the initial admin password
pub const ADMIN_PASSWORD_ENV: &str = "TALLY_ADMIN_PASSWORD";

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Seed the admin account if TALLY_ADMIN_PASSWORD is set
///
/// Returns true if a new account was created.
pub fn seed_admin_from_env(db: &Database) -> Result<bool> {
    let Some(password) = std::env::var(ADMIN_PASSWORD_ENV)
        .ok()
        .filter(|p| !p.is_empty())
    else {
        return Ok(false);
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!(
            "{} is shorter than {} characters; skipping admin seed",
            ADMIN_PASSWORD_ENV, MIN_PASSWORD_LEN
        );
        return Ok(false);
    }

    db.ensure_admin(&password)
        .context("Failed to seed admin account")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if seed_admin_from_env(&db)? {
        println!("   Created '{}' account", ADMIN_USERNAME);
    } else if db.get_user_by_username(ADMIN_USERNAME)?.is_some() {
        println!("   '{}' account already present", ADMIN_USERNAME);
    } else {
        println!(
            "   💡 Tip: Set {} to create the '{}' account",
            ADMIN_PASSWORD_ENV, ADMIN_USERNAME
        );
    }

    if db.is_encrypted()? {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create an account: tally users add <name>");
    println!("  2. Talk to the assistant: tally ask --user-id 1 \"I bought a coffee for 4.50\"");
    println!("  3. Start the API: tally serve");

    Ok(())
}
