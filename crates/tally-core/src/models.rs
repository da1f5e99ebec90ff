//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Only admins may see other users' purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Whether this role may read records owned by other users
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated identity a request runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: i64, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }
}

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn as_caller(&self) -> Caller {
        Caller::new(self.id, self.username.clone(), self.role)
    }
}

/// How necessary the model judged a purchase to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Necessity {
    Low,
    Medium,
    High,
}

impl Necessity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for Necessity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "mid" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown necessity: {}", s)),
        }
    }
}

impl std::fmt::Display for Necessity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a purchase record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Created directly from a user's description
    #[default]
    Confirmed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
        }
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            _ => Err(format!("Unknown purchase status: {}", s)),
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub subcategory: String,
    pub vendor: Option<String>,
    pub necessity: Option<Necessity>,
    pub emotional_tone: String,
    pub reason_guess: String,
    /// Model confidence in the extraction, 0.0 to 1.0
    pub confidence: f64,
    pub purchase_time: DateTime<Utc>,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

/// A validated purchase ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub user_id: i64,
    pub title: String,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub subcategory: String,
    pub vendor: Option<String>,
    pub necessity: Option<Necessity>,
    pub emotional_tone: String,
    pub reason_guess: String,
    pub confidence: f64,
    pub purchase_time: DateTime<Utc>,
    pub status: PurchaseStatus,
}

/// Category with the largest summed amount under a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TopCategory {
    /// Empty when nothing matched
    pub category: String,
    pub total: f64,
}

/// One exchange with the language model, kept for auditing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub input_text: String,
    pub ai_output: String,
    pub created_at: DateTime<Utc>,
}
