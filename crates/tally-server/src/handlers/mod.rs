//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod ai_logs;
pub mod auth;
pub mod me;
pub mod messages;
pub mod purchases;

// Re-export all handlers for use in router
pub use ai_logs::*;
pub use auth::*;
pub use me::*;
pub use messages::*;
pub use purchases::*;
