//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - OpenAI (https://api.openai.com)
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (default: https://api.openai.com if an API key is set)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4.1-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::Caller;
use crate::prompts::PromptLibrary;

use super::parsing::{external, interpretation_text, snippet, summary_from_text, transport_error};
use super::types::{AnalyticsPayload, Summary};
use super::{
    interpret_prompt, summary_prompt, AIBackend, ChatPrompt, DEFAULT_TIMEOUT,
    INTERPRET_MAX_TOKENS, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE,
};

/// Public OpenAI endpoint used when only an API key is configured
pub const OPENAI_DEFAULT_HOST: &str = "https://api.openai.com";

/// Default model when `OPENAI_COMPATIBLE_MODEL` is unset
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// OpenAI-compatible backend
///
/// Works with any server implementing the OpenAI `/v1/chat/completions` API.
///
/// # Example
///
/// ```rust,ignore
/// // OpenAI
/// export OPENAI_COMPATIBLE_API_KEY="sk-..."
///
/// // vLLM
/// export OPENAI_COMPATIBLE_HOST="http://192.168.1.100:8000"
/// export OPENAI_COMPATIBLE_MODEL="meta-llama/Llama-3.2-3B-Instruct"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a specific prompt library (e.g. embedded-only in tests)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Create from environment variables
    ///
    /// Uses `OPENAI_COMPATIBLE_HOST` if set; otherwise falls back to the public
    /// OpenAI endpoint when `OPENAI_COMPATIBLE_API_KEY` is present. Returns None
    /// when neither is set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_COMPATIBLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let host = match std::env::var("OPENAI_COMPATIBLE_HOST") {
            Ok(host) => host,
            Err(_) if api_key.is_some() => OPENAI_DEFAULT_HOST.to_string(),
            Err(_) => return None,
        };
        let model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| OPENAI_DEFAULT_MODEL.to_string());

        let mut backend = Self::new(&host, &model);
        backend.api_key = api_key;
        Some(backend)
    }

    /// Run one chat exchange; returns the first choice's text and the raw body
    async fn chat_completion(
        &self,
        prompt: ChatPrompt,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Result<(String, String)> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user,
                },
            ],
            temperature,
            max_tokens: Some(max_tokens),
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| transport_error("chat completion", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("chat completion", e))?;

        if !status.is_success() {
            return Err(external(
                format!("chat completion API error {}: {}", status, snippet(&body)),
                body,
            ));
        }

        let chat_response: ChatCompletionResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(external(
                    format!("unexpected chat completion response: {}", e),
                    body,
                ))
            }
        };

        match chat_response.choices.into_iter().next() {
            Some(choice) => Ok((choice.message.content, body)),
            None => Err(external("no choices returned", body)),
        }
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn interpret_message(&self, caller: &Caller, message: &str) -> Result<String> {
        let prompt = interpret_prompt(&self.prompts, caller, message)?;
        let (text, body) = self
            .chat_completion(prompt, INTERPRET_MAX_TOKENS, Some(0.1))
            .await?;
        debug!(user_id = caller.user_id, "OpenAI-compatible interpretation: {}", text);

        interpretation_text(text, &body)
    }

    async fn summarize_analysis(&self, payload: &AnalyticsPayload) -> Result<Summary> {
        let prompt = summary_prompt(&self.prompts, payload)?;
        let (text, body) = self
            .chat_completion(prompt, SUMMARY_MAX_TOKENS, Some(SUMMARY_TEMPERATURE))
            .await?;
        debug!("OpenAI-compatible summary: {}", text);

        summary_from_text(&text, body)
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        let mut models = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .timeout(self.timeout);
        if let Some(ref api_key) = self.api_key {
            models = models.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Ok(resp) = models.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (common for LocalAI, llama-server)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
