//! One-shot conversation with the assistant

use anyhow::{bail, Context, Result};
use tally_core::ai::AIClient;
use tally_core::db::Database;
use tally_core::models::{Caller, Role};
use tally_core::{DispatchOutcome, MessageDispatcher};

/// Build the AI client from environment, failing with a hint when none is configured
pub fn ai_from_env() -> Result<AIClient> {
    AIClient::from_env().context(
        "No AI backend configured. Set AI_BACKEND plus OPENAI_COMPATIBLE_HOST or OLLAMA_HOST",
    )
}

/// Send `message` as the stored user `user_id`
///
/// `role_override` replaces the stored role for this call only.
pub async fn cmd_ask(
    db: &Database,
    ai: &AIClient,
    user_id: i64,
    role_override: Option<&str>,
    message: &str,
) -> Result<DispatchOutcome> {
    if message.trim().is_empty() {
        bail!("Message is empty");
    }

    let user = db
        .get_user(user_id)?
        .with_context(|| format!("User {} not found", user_id))?;

    let role = match role_override {
        Some(r) => r.parse::<Role>().map_err(anyhow::Error::msg)?,
        None => user.role,
    };
    let caller = Caller::new(user.id, user.username, role);

    let dispatcher = MessageDispatcher::new(db, ai);
    let outcome = dispatcher.handle_message(&caller, message).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(outcome)
}
