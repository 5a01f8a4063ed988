//! Error types for roomchat.

use thiserror::Error;

/// Common error type for process-level failures.
///
/// Client-facing chat errors live in [`crate::chat::ChatError`]; this type
/// covers startup and I/O concerns that are fatal to the server, not to a
/// single connection.
#[derive(Error, Debug)]
pub enum RoomchatError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for roomchat operations.
pub type Result<T> = std::result::Result<T, RoomchatError>;
