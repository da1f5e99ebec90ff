//! Mock backend for testing
//!
//! Answers with envelopes derived from simple keyword matching, or with a
//! scripted queue of raw replies. Useful for unit tests and development
//! without a running model server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{Error, Result};
use crate::models::Caller;

use super::parsing::external;
use super::types::{AnalyticsPayload, Summary};
use super::AIBackend;

/// Mock AI backend for testing
///
/// Scripted replies are consumed first, in order. Once the queue is empty
/// the backend falls back to the keyword heuristic.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    replies: Arc<Mutex<VecDeque<String>>>,
    summary: Option<String>,
    fail_summary: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            summary: None,
            fail_summary: false,
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Answer interpretation calls with these raw replies, in order
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::new()
        }
    }

    /// Fixed summary text
    pub fn with_summary(mut self, text: &str) -> Self {
        self.summary = Some(text.to_string());
        self
    }

    /// Make every summary call fail
    pub fn failing_summary(mut self) -> Self {
        self.fail_summary = true;
        self
    }

    fn next_reply(&self) -> Result<Option<String>> {
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| Error::InvalidData("Failed to acquire mock reply lock".into()))?;
        Ok(replies.pop_front())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn interpret_message(&self, _caller: &Caller, message: &str) -> Result<String> {
        if let Some(reply) = self.next_reply()? {
            return Ok(reply);
        }
        Ok(heuristic_envelope(message).to_string())
    }

    async fn summarize_analysis(&self, payload: &AnalyticsPayload) -> Result<Summary> {
        if self.fail_summary {
            return Err(external(
                "mock summarizer unavailable",
                r#"{"error":"mock summarizer unavailable"}"#,
            ));
        }

        let text = match &self.summary {
            Some(text) => text.clone(),
            None if payload.purchase_count == 0 => {
                "There are no purchases matching that request.".to_string()
            }
            None => format!(
                "You made {} purchases totalling {:.2}. The top category was {} at {:.2}.",
                payload.purchase_count,
                payload.total_amount,
                payload.top_category,
                payload.top_category_total
            ),
        };

        Ok(Summary {
            raw: json!({ "summary": text }).to_string(),
            text,
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock"
    }
}

/// Build an envelope from keywords in the message
fn heuristic_envelope(message: &str) -> serde_json::Value {
    let lower = message.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["bought", "spent", "paid"]) {
        if let Some(amount) = first_number(message) {
            let title = item_after_bought(message).unwrap_or_else(|| "Purchase".to_string());
            return json!({
                "action": "add",
                "data": {
                    "title": title,
                    "amount": amount,
                    "currency": "USD",
                    "confidence": 0.5,
                },
                "assistant_reply": format!("Saved {} for {:.2}.", title, amount),
            });
        }
    }

    if has(&["analy", "summar", "breakdown"]) {
        return json!({
            "action": "analyze",
            "analysis": { "intent": "spending_summary" },
            "assistant_reply": "Here is a look at your spending.",
        });
    }

    if has(&["show", "list", "what did"]) {
        return json!({
            "action": "query",
            "filters": {},
            "assistant_reply": "Here are your purchases.",
        });
    }

    json!({
        "action": "unknown",
        "assistant_reply": "Sorry, I can only record, list or analyze purchases.",
    })
}

fn first_number(message: &str) -> Option<f64> {
    message
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_digit() && c != '.'))
        .filter(|word| !word.is_empty())
        .find_map(|word| word.trim_end_matches('.').parse::<f64>().ok())
        .filter(|n| *n > 0.0)
}

/// "I bought a desk lamp for 35" -> "desk lamp"
fn item_after_bought(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let start = lower.find("bought ")? + "bought ".len();
    let rest = &message[start..];
    let end = rest.to_lowercase().find(" for ").unwrap_or(rest.len());
    let item = rest[..end]
        .trim()
        .trim_start_matches("a ")
        .trim_start_matches("an ")
        .trim_start_matches("some ")
        .trim();
    (!item.is_empty()).then(|| item.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{parse_envelope, Action};
    use crate::models::Role;

    fn caller() -> Caller {
        Caller::new(1, "sam", Role::User)
    }

    #[tokio::test]
    async fn test_heuristic_add() {
        let mock = MockBackend::new();
        let raw = mock
            .interpret_message(&caller(), "I bought a desk lamp for $35.50 yesterday")
            .await
            .unwrap();
        let env = parse_envelope(&raw).unwrap();
        assert_eq!(env.action, Action::Add);
        assert_eq!(env.purchase.title.as_deref(), Some("desk lamp"));
        assert_eq!(env.purchase.amount, Some(35.5));
    }

    #[tokio::test]
    async fn test_heuristic_query_analyze_unknown() {
        let mock = MockBackend::new();
        let query = mock.interpret_message(&caller(), "show my purchases").await.unwrap();
        assert_eq!(parse_envelope(&query).unwrap().action, Action::Query);

        let analyze = mock
            .interpret_message(&caller(), "analyze my spending")
            .await
            .unwrap();
        assert_eq!(parse_envelope(&analyze).unwrap().action, Action::Analyze);

        let unknown = mock.interpret_message(&caller(), "hello there").await.unwrap();
        let env = parse_envelope(&unknown).unwrap();
        assert_eq!(env.action, Action::Unknown("unknown".into()));
        assert!(!env.assistant_reply.is_empty());
    }

    #[tokio::test]
    async fn test_spent_without_number_is_not_add() {
        let mock = MockBackend::new();
        let raw = mock
            .interpret_message(&caller(), "where have I spent the most")
            .await
            .unwrap();
        assert_ne!(parse_envelope(&raw).unwrap().action, Action::Add);
    }

    #[tokio::test]
    async fn test_scripted_replies_come_first() {
        let mock = MockBackend::with_replies(vec!["not json".into()]);
        assert_eq!(mock.interpret_message(&caller(), "x").await.unwrap(), "not json");
        // queue drained, heuristic takes over
        let raw = mock.interpret_message(&caller(), "list").await.unwrap();
        assert!(parse_envelope(&raw).is_ok());
    }

    #[tokio::test]
    async fn test_summary_variants() {
        let payload = AnalyticsPayload {
            total_amount: 70.0,
            top_category: "Food".into(),
            top_category_total: 50.0,
            purchase_count: 2,
            filters: Default::default(),
        };

        let text = MockBackend::new().summarize_analysis(&payload).await.unwrap().text;
        assert!(text.contains("70.00"));
        assert!(text.contains("Food"));

        let fixed = MockBackend::new().with_summary("All good.");
        assert_eq!(fixed.summarize_analysis(&payload).await.unwrap().text, "All good.");

        let err = MockBackend::new()
            .failing_summary()
            .summarize_analysis(&payload)
            .await
            .unwrap_err();
        assert!(err.raw_output().is_some());
    }

    #[tokio::test]
    async fn test_health() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
