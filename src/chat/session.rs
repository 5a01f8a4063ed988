//! Per-connection session state and request handling.
//!
//! A [`SessionHandler`] is owned by exactly one connection task. It keeps the
//! connection's [`Session`] (current room and username) and turns client
//! requests into registry calls, returning the acknowledgement to send back.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::dispatch::EventReceiver;
use super::error::ChatError;
use super::registry::RoomRegistry;

/// Unique identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The current room membership of one connection.
///
/// Both fields are set together on join and cleared together on leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: ConnectionId,
    room: Option<String>,
    username: Option<String>,
}

impl Session {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            room: None,
            username: None,
        }
    }

    /// Connection ID of this session.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Name of the room the connection is in.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Display name used in the current room.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Check whether the connection is in a room.
    pub fn is_joined(&self) -> bool {
        self.room.is_some() && self.username.is_some()
    }

    pub(crate) fn set_membership(&mut self, room: impl Into<String>, username: impl Into<String>) {
        self.room = Some(room.into());
        self.username = Some(username.into());
    }

    /// Clear the membership, returning `(room, username)` if there was one.
    pub(crate) fn take_membership(&mut self) -> Option<(String, String)> {
        match (self.room.take(), self.username.take()) {
            (Some(room), Some(username)) => Some((room, username)),
            _ => None,
        }
    }
}

/// A decoded client request.
///
/// Payload fields are `None` when the client omitted them or sent a value of
/// the wrong type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List room names.
    GetRooms,
    /// Create a room.
    CreateRoom {
        /// Room name.
        room: Option<String>,
    },
    /// Join a room under a display name.
    JoinRoom {
        /// Display name.
        username: Option<String>,
        /// Room name.
        room: Option<String>,
    },
    /// Send a chat message to the current room.
    SendMessage {
        /// Raw message text.
        text: Option<String>,
    },
    /// Leave the current room without disconnecting.
    LeaveRoom,
}

/// Acknowledgement returned to the requesting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Ack {
    /// Room list for `getRooms`.
    Rooms(Vec<String>),
    /// Request failed.
    Error {
        /// User-facing error text.
        error: String,
    },
    /// Room created (or already existed).
    Created {
        /// Always true.
        ok: bool,
        /// Current room names.
        rooms: Vec<String>,
    },
    /// Joined a room.
    Joined {
        /// Always true.
        ok: bool,
        /// Current members of the joined room.
        users: Vec<String>,
    },
    /// Request succeeded with nothing to report.
    Ok {
        /// Always true.
        ok: bool,
    },
}

impl Ack {
    /// Successful acknowledgement without data.
    pub fn ok() -> Self {
        Self::Ok { ok: true }
    }

    /// Acknowledgement for a created room.
    pub fn created(rooms: Vec<String>) -> Self {
        Self::Created { ok: true, rooms }
    }

    /// Acknowledgement for a joined room.
    pub fn joined(users: Vec<String>) -> Self {
        Self::Joined { ok: true, users }
    }

    /// Error acknowledgement.
    pub fn error(error: impl fmt::Display) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }
}

impl From<ChatError> for Ack {
    fn from(e: ChatError) -> Self {
        Self::error(e)
    }
}

/// Bridges one connection's requests to the shared registry.
pub struct SessionHandler {
    registry: Arc<RoomRegistry>,
    session: Session,
}

impl SessionHandler {
    /// Register a new connection with the registry.
    ///
    /// Returns the handler and the receiver for events addressed to this
    /// connection.
    pub async fn connect(registry: Arc<RoomRegistry>) -> (Self, EventReceiver) {
        let (session, events) = registry.connect().await;
        (Self { registry, session }, events)
    }

    /// The connection's session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle a request.
    ///
    /// Returns `None` when the request must go unacknowledged.
    pub async fn handle(&mut self, request: Request) -> Option<Ack> {
        match request {
            Request::GetRooms => Some(self.get_rooms().await),
            Request::CreateRoom { room } => Some(self.create_room(room).await),
            Request::JoinRoom { username, room } => Some(self.join_room(username, room).await),
            Request::SendMessage { text } => self.send_message(text).await,
            Request::LeaveRoom => Some(self.leave_room().await),
        }
    }

    /// List rooms.
    pub async fn get_rooms(&self) -> Ack {
        Ack::Rooms(self.registry.list_rooms().await)
    }

    /// Create a room.
    pub async fn create_room(&self, room: Option<String>) -> Ack {
        let Some(room) = room else {
            return ChatError::MissingData.into();
        };
        match self.registry.create_room(&room).await {
            Ok(rooms) => Ack::created(rooms),
            Err(e) => e.into(),
        }
    }

    /// Join a room, leaving the current one first if needed.
    pub async fn join_room(&mut self, username: Option<String>, room: Option<String>) -> Ack {
        let (Some(username), Some(room)) = (username, room) else {
            return ChatError::MissingData.into();
        };
        match self
            .registry
            .join_room(&mut self.session, &username, &room)
            .await
        {
            Ok(users) => Ack::joined(users),
            Err(e) => {
                tracing::debug!(conn_id = %self.session.id(), error = %e, "join rejected");
                e.into()
            }
        }
    }

    /// Send a message to the current room.
    ///
    /// Blank text is acknowledged without being broadcast. A connection that
    /// has not joined a room gets no acknowledgement.
    pub async fn send_message(&self, text: Option<String>) -> Option<Ack> {
        let Some(text) = text else {
            return Some(ChatError::MissingData.into());
        };
        match self.registry.send_message(&self.session, &text).await {
            Ok(()) => Some(Ack::ok()),
            Err(ChatError::NotJoined) => {
                tracing::debug!(conn_id = %self.session.id(), "message from connection outside any room dropped");
                None
            }
            Err(e) => Some(e.into()),
        }
    }

    /// Leave the current room. Succeeds even when not in a room.
    pub async fn leave_room(&mut self) -> Ack {
        self.registry.leave(&mut self.session).await;
        Ack::ok()
    }

    /// Tear down the connection: leave its room and stop event delivery.
    pub async fn disconnect(mut self) {
        self.registry.disconnect(&mut self.session).await;
    }
}
