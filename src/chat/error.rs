//! Errors returned to chat clients.

use thiserror::Error;

/// A recoverable, user-facing chat error.
///
/// The display text is what the requesting client receives in its
/// acknowledgement.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatError {
    /// Room name is empty or whitespace-only.
    #[error("Invalid room name")]
    InvalidName,

    /// Username or room missing from a join request, or a malformed payload.
    #[error("Missing data")]
    MissingData,

    /// Another member of the room already uses this username.
    #[error("Username already taken in this room")]
    NameTaken,

    /// The connection has not joined a room.
    #[error("You are not in a room")]
    NotJoined,
}
