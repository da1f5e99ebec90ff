//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tally_server::ServerConfig;

use super::{open_db, seed_admin_from_env};

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, no_encrypt: bool) -> Result<()> {
    let config = ServerConfig::from_env().context("Server configuration incomplete")?;

    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!(
        "   🔐 Tokens: HS256, valid for {} hours",
        config.auth.token_ttl.num_hours()
    );
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} ({})",
            config.allowed_origins.join(", "),
            tally_server::ALLOWED_ORIGINS_ENV
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    // Idempotent
    seed_admin_from_env(&db)?;

    tally_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
