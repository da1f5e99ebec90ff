//! Test utilities for tally-core
//!
//! A mock chat server speaking both the OpenAI-compatible and the Ollama
//! chat APIs. Replies are scripted per test and every request body is
//! recorded for assertions.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Reply used when no scripted reply is queued
const DEFAULT_CONTENT: &str =
    r#"{"action":"unknown","assistant_reply":"The mock server has nothing scripted."}"#;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with this text as the assistant message
    Content(String),
    /// Non-success status with a plain body
    Status(u16, String),
    /// 200 with this exact body instead of a chat envelope
    RawBody(String),
    /// Like `Content`, after sleeping
    Delayed(Duration, String),
}

impl MockReply {
    pub fn content(text: &str) -> Self {
        Self::Content(text.to_string())
    }

    pub fn status(code: u16, body: &str) -> Self {
        Self::Status(code, body.to_string())
    }

    pub fn raw_body(body: &str) -> Self {
        Self::RawBody(body.to_string())
    }

    pub fn delayed(delay: Duration, text: &str) -> Self {
        Self::Delayed(delay, text.to_string())
    }
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockState {
    fn record(&self, body: Value) -> MockReply {
        self.requests.lock().unwrap().push(body);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::content(DEFAULT_CONTENT))
    }
}

/// Which wire format a chat reply is wrapped in
#[derive(Clone, Copy)]
enum Flavor {
    OpenAI,
    Ollama,
}

impl Flavor {
    fn wrap(self, model: &str, content: &str) -> Value {
        match self {
            Flavor::OpenAI => json!({
                "id": "chatcmpl-mock",
                "object": "chat.completion",
                "model": model,
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": content },
                    "finish_reason": "stop"
                }]
            }),
            Flavor::Ollama => json!({
                "model": model,
                "message": { "role": "assistant", "content": content },
                "done": true
            }),
        }
    }
}

/// Mock chat server for testing and development
pub struct MockChatServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/health", get(|| async { "ok" }))
            .route("/api/tags", get(handle_tags))
            .route("/v1/chat/completions", post(handle_openai_chat))
            .route("/api/chat", post(handle_ollama_chat))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a reply for the next chat request
    pub fn push(&self, reply: MockReply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    /// Request bodies received so far, oldest first
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{ "id": "mock-model", "object": "model" }]
    }))
}

async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{ "name": "llama3.2:latest", "size": 4_000_000_000u64 }]
    }))
}

async fn handle_openai_chat(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    respond(&state, body, Flavor::OpenAI).await
}

async fn handle_ollama_chat(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    respond(&state, body, Flavor::Ollama).await
}

async fn respond(state: &MockState, body: Value, flavor: Flavor) -> Response {
    let model = body["model"].as_str().unwrap_or("mock-model").to_string();

    match state.record(body) {
        MockReply::Content(text) => Json(flavor.wrap(&model, &text)).into_response(),
        MockReply::Status(code, text) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, text).into_response()
        }
        MockReply::RawBody(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            text,
        )
            .into_response(),
        MockReply::Delayed(delay, text) => {
            tokio::time::sleep(delay).await;
            Json(flavor.wrap(&model, &text)).into_response()
        }
    }
}
