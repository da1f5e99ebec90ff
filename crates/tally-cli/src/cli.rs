//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Track purchases by talking about them
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Conversational purchase tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database (seeds `admin` when TALLY_ADMIN_PASSWORD is set)
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Send one message to the assistant as a stored user
    Ask {
        /// User the message is sent as
        #[arg(long)]
        user_id: i64,

        /// Act with this role instead of the stored one (user, admin)
        #[arg(long)]
        role: Option<String>,

        /// What to tell the assistant
        message: String,
    },

    /// List stored purchases, newest first
    Purchases {
        /// Only this owner's purchases
        #[arg(long)]
        user_id: Option<i64>,

        /// Maximum number of rows
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show recent model exchanges
    Logs {
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Manage user accounts
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Manage AI prompts (list, show, path)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List accounts
    List,

    /// Create an account
    Add {
        /// Login name
        username: String,

        /// Password (falls back to TALLY_NEW_PASSWORD)
        #[arg(long)]
        password: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (interpret_message, summarize_analysis)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
