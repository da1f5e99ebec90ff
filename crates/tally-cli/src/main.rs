//! Tally CLI - Conversational purchase tracker
//!
//! Usage:
//!   tally init                              Initialize database
//!   tally users add alice                   Create an account
//!   tally ask --user-id 1 "I bought tea"    Talk to the assistant
//!   tally serve --port 3000                 Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env next to the binary's working directory
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt).await
        }
        Commands::Ask {
            user_id,
            role,
            message,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let ai = commands::ai_from_env()?;
            commands::cmd_ask(&db, &ai, user_id, role.as_deref(), &message).await?;
            Ok(())
        }
        Commands::Purchases { user_id, limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_purchases(&db, user_id, limit)?;
            Ok(())
        }
        Commands::Logs { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_logs(&db, limit)?;
            Ok(())
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UsersAction::List) => {
                    commands::cmd_users_list(&db)?;
                }
                Some(UsersAction::Add {
                    username,
                    password,
                    admin,
                }) => {
                    let password = commands::resolve_new_password(password)?;
                    commands::cmd_users_add(&db, &username, &password, admin)?;
                }
            }
            Ok(())
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
