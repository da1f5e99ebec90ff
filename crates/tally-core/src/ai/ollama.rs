//! Ollama backend implementation
//!
//! HTTP client for the Ollama chat API (`/api/chat`). Uses the prompt library
//! for customizable prompts.

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

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout: DEFAULT_TIMEOUT,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
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
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    /// Run one chat exchange; returns the reply text and the raw body
    async fn chat(
        &self,
        prompt: ChatPrompt,
        num_predict: u32,
        temperature: Option<f32>,
        json_format: bool,
    ) -> Result<(String, String)> {
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: prompt.system,
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: prompt.user,
                },
            ],
            stream: false,
            format: json_format.then(|| "json".to_string()),
            options: OllamaOptions {
                num_predict,
                temperature,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if !status.is_success() {
            return Err(external(
                format!("Ollama API error {}: {}", status, snippet(&body)),
                body,
            ));
        }

        match serde_json::from_str::<OllamaChatResponse>(&body) {
            Ok(parsed) => Ok((parsed.message.content, body)),
            Err(e) => Err(external(format!("unexpected Ollama response: {}", e), body)),
        }
    }
}

/// Request to the Ollama chat API
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    /// "json" constrains the reply to a JSON document
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from the Ollama chat API
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn interpret_message(&self, caller: &Caller, message: &str) -> Result<String> {
        let prompt = interpret_prompt(&self.prompts, caller, message)?;
        let (text, body) = self
            .chat(prompt, INTERPRET_MAX_TOKENS, Some(0.1), true)
            .await?;
        debug!(user_id = caller.user_id, "Ollama interpretation: {}", text);

        interpretation_text(text, &body)
    }

    async fn summarize_analysis(&self, payload: &AnalyticsPayload) -> Result<Summary> {
        let prompt = summary_prompt(&self.prompts, payload)?;
        let (text, body) = self
            .chat(prompt, SUMMARY_MAX_TOKENS, Some(SUMMARY_TEMPERATURE), false)
            .await?;
        debug!("Ollama summary: {}", text);

        summary_from_text(&text, body)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
