//! Error types for the arena crates.

use crate::ids::EntityHandle;
use thiserror::Error;

/// Top-level error type for arena operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Object pool misuse (double release, stale handle)
    #[error("Pool error: {0}")]
    Pool(String),

    /// The handle does not name a live bot
    #[error("Bot not found: {0}")]
    BotNotFound(EntityHandle),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Resource catalog errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
