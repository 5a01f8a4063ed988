//! Events pushed from the server to connected clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A user-authored chat message, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Sender's display name.
    pub from: String,
    /// Formatted message body.
    pub html: String,
    /// When the message was sent.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new chat message timestamped now.
    pub fn new(from: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            html: html.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A server-generated presence notification.
///
/// Always carries the room's member list so clients can resync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemMessage {
    /// Always `true`; lets clients tell system lines from chat lines.
    pub system: bool,
    /// Notification text.
    pub text: String,
    /// When the event happened.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Current members of the room, in join order.
    pub users: Vec<String>,
}

impl SystemMessage {
    /// Create a system message.
    pub fn new(text: impl Into<String>, users: Vec<String>) -> Self {
        Self {
            system: true,
            text: text.into(),
            timestamp: Utc::now(),
            users,
        }
    }

    /// Create a join notification.
    pub fn join(username: &str, users: Vec<String>) -> Self {
        Self::new(format!("{username} joined."), users)
    }

    /// Create a leave notification.
    pub fn leave(username: &str, users: Vec<String>) -> Self {
        Self::new(format!("{username} left."), users)
    }
}

/// An event delivered to one or more connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The set of rooms changed.
    RoomsList(Vec<String>),
    /// Join/leave notification.
    SystemMessage(SystemMessage),
    /// Chat message.
    Message(ChatMessage),
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomsList(_) => "roomsList",
            ServerEvent::SystemMessage(_) => "systemMessage",
            ServerEvent::Message(_) => "message",
        }
    }
}
