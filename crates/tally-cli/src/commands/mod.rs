//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database setup (init) and shared utilities (open_db)
//! - `ask` - One-shot conversation with the assistant
//! - `purchases` - Stored purchase listing
//! - `logs` - Model exchange audit log
//! - `users` - Account management
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command

pub mod ask;
pub mod core;
pub mod logs;
pub mod prompts;
pub mod purchases;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use ask::*;
pub use core::*;
pub use logs::*;
pub use prompts::*;
pub use purchases::*;
pub use serve::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
