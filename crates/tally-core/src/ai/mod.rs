//! Pluggable language model backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the two operations the dispatcher needs
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `OllamaBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env().expect("no AI backend configured");
//! let raw = ai.interpret_message(&caller, "I bought a lamp for 35 dollars").await?;
//! let envelope = tally_core::envelope::parse_envelope(&raw)?;
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, ollama, mock). Default: openai_compatible
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (default: https://api.openai.com when an API key is set)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4.1-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)
//! - `AI_TIMEOUT_SECS`: Per-request timeout (default: 30)

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Caller;
use crate::prompts::{PromptId, PromptLibrary};

/// Default per-request timeout for model calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding [`DEFAULT_TIMEOUT`]
pub const TIMEOUT_ENV: &str = "AI_TIMEOUT_SECS";

/// Token budget for interpreting a message
pub(crate) const INTERPRET_MAX_TOKENS: u32 = 800;
/// Token budget for an analytics summary
pub(crate) const SUMMARY_MAX_TOKENS: u32 = 300;
pub(crate) const SUMMARY_TEMPERATURE: f32 = 0.2;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks. Calls
/// are bounded by the backend's timeout and never retried.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Ask the model to interpret a user's message
    ///
    /// Returns the model's raw text, expected to be one JSON envelope. No
    /// validation of that text happens here.
    async fn interpret_message(&self, caller: &Caller, message: &str) -> Result<String>;

    /// Render analytics as a short natural-language summary
    async fn summarize_analysis(&self, payload: &AnalyticsPayload) -> Result<Summary>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
/// All variants implement the same AIBackend operations.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible backend (OpenAI, vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama backend (HTTP chat API)
    Ollama(OllamaBackend),
    /// Mock backend for testing and offline development
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai_compatible` (default): Uses OPENAI_COMPATIBLE_* variables
    /// - `ollama`: Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());
        let timeout = timeout_from_env();

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env()
                    .map(|b| AIClient::OpenAICompatible(b.with_timeout(timeout)))
            }
            "ollama" => OllamaBackend::from_env().map(|b| AIClient::Ollama(b.with_timeout(timeout))),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env()
                    .map(|b| AIClient::OpenAICompatible(b.with_timeout(timeout)))
            }
        }
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str) -> Self {
        AIClient::OpenAICompatible(OpenAICompatibleBackend::new(host, model))
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Short name of the active backend
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Ollama(_) => "ollama",
            AIClient::Mock(_) => "mock",
        }
    }

    pub fn info(&self) -> BackendInfo {
        BackendInfo {
            kind: self.kind().to_string(),
            model: self.model().to_string(),
            host: self.host().to_string(),
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn interpret_message(&self, caller: &Caller, message: &str) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.interpret_message(caller, message).await,
            AIClient::Ollama(b) => b.interpret_message(caller, message).await,
            AIClient::Mock(b) => b.interpret_message(caller, message).await,
        }
    }

    async fn summarize_analysis(&self, payload: &AnalyticsPayload) -> Result<Summary> {
        match self {
            AIClient::OpenAICompatible(b) => b.summarize_analysis(payload).await,
            AIClient::Ollama(b) => b.summarize_analysis(payload).await,
            AIClient::Mock(b) => b.summarize_analysis(payload).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Read `AI_TIMEOUT_SECS`, falling back to [`DEFAULT_TIMEOUT`]
pub fn timeout_from_env() -> Duration {
    std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// System and user messages for one chat exchange
#[derive(Debug, Clone)]
pub(crate) struct ChatPrompt {
    pub system: String,
    pub user: String,
}

fn render(
    prompts: &RwLock<PromptLibrary>,
    id: PromptId,
    vars: &HashMap<&str, &str>,
) -> Result<ChatPrompt> {
    let mut prompts = prompts
        .write()
        .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
    let template = prompts.get(id)?;
    Ok(ChatPrompt {
        system: template.render_system(vars),
        user: template.render_user(vars),
    })
}

/// Prompt asking the model to turn a message into an action envelope
pub(crate) fn interpret_prompt(
    prompts: &RwLock<PromptLibrary>,
    caller: &Caller,
    message: &str,
) -> Result<ChatPrompt> {
    let user_id = caller.user_id.to_string();
    let mut vars = HashMap::new();
    vars.insert("user_id", user_id.as_str());
    vars.insert("username", caller.username.as_str());
    vars.insert("role", caller.role.as_str());
    vars.insert("message", message);
    render(prompts, PromptId::InterpretMessage, &vars)
}

/// Prompt asking the model to summarize analytics
pub(crate) fn summary_prompt(
    prompts: &RwLock<PromptLibrary>,
    payload: &AnalyticsPayload,
) -> Result<ChatPrompt> {
    let data = serde_json::to_string_pretty(payload)?;
    let mut vars = HashMap::new();
    vars.insert("data", data.as_str());
    render(prompts, PromptId::SummarizeAnalysis, &vars)
}
