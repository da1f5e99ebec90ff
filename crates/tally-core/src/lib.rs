//! Tally Core Library
//!
//! Shared functionality for the Tally purchase assistant:
//! - Normalization of language model output into typed envelopes
//! - Role-scoped purchase filters and the visibility policy
//! - Message dispatch (add, query, analyze)
//! - Database access, migrations and purchase aggregations
//! - Pluggable AI backends (OpenAI-compatible, Ollama, mock)
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod coerce;
pub mod credentials;
pub mod db;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod models;
pub mod policy;
pub mod prompts;
pub mod store;

/// Test utilities including a mock chat server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, AnalyticsPayload, BackendInfo, MockBackend, OllamaBackend,
    OpenAICompatibleBackend, Summary,
};
pub use db::Database;
pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use envelope::{parse_envelope, Action, AiEnvelope, FilterRequest, RequestContext};
pub use error::{Error, Result};
pub use filter::{build_filter, PurchaseFilter};
pub use models::{AiLogEntry, Caller, Purchase, Role, User};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use store::PurchaseStore;
