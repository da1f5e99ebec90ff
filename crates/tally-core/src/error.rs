//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The model's text could not be read as an action envelope
    #[error("Malformed AI output: {reason}")]
    MalformedAiOutput { reason: String, raw: String },

    /// The model asked to create a purchase that fails validation
    #[error("Invalid purchase: {reason}")]
    InvalidPurchase { reason: String, reply: String },

    #[error("Unknown action: {action}")]
    UnknownAction { action: String, reply: String },

    /// The language model or summarizer failed (transport, status, timeout, shape)
    #[error("External service error: {message}")]
    ExternalService { message: String, raw: String },

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Raw model text attached to this error, if any
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::MalformedAiOutput { raw, .. } | Self::ExternalService { raw, .. } => {
                Some(raw.as_str())
            }
            _ => None,
        }
    }

    /// The assistant's natural-language reply carried by client-facing errors
    pub fn assistant_reply(&self) -> Option<&str> {
        match self {
            Self::InvalidPurchase { reply, .. } | Self::UnknownAction { reply, .. } => {
                Some(reply.as_str())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
