//! Response helpers shared by the HTTP backends
//!
//! Interpretation output is returned verbatim (the envelope normalizer owns
//! its validation). These helpers only deal with transport-level shapes and
//! the summarizer's plain-text reply.

use crate::error::{Error, Result};

use super::types::Summary;

/// Longest raw snippet included in an error message
const MAX_SNIPPET: usize = 200;

/// Truncate a raw response for inclusion in messages and logs
pub fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_SNIPPET {
        let cut: String = trimmed.chars().take(MAX_SNIPPET).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

/// Build an `ExternalService` error
pub fn external(message: impl Into<String>, raw: impl Into<String>) -> Error {
    Error::ExternalService {
        message: message.into(),
        raw: raw.into(),
    }
}

/// Map a transport failure, calling out timeouts explicitly
pub fn transport_error(service: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        external(format!("{} request timed out", service), "")
    } else {
        external(format!("{} request failed: {}", service, e), "")
    }
}

/// Accept the summarizer's text if it has any content
pub fn summary_from_text(text: &str, raw: String) -> Result<Summary> {
    let text = text.trim();
    if text.is_empty() {
        return Err(external("summarizer returned an empty reply", raw));
    }
    Ok(Summary {
        text: text.to_string(),
        raw,
    })
}

/// Reject an empty interpretation before it reaches the normalizer
pub fn interpretation_text(text: String, raw: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(external("model returned an empty reply", raw));
    }
    Ok(text)
}
