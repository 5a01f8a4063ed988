//! Chat room membership.
//!
//! A room is plain data: the registry's lock is the only synchronization,
//! so nothing here is async or shared. The registry keys rooms by name.

use super::session::ConnectionId;

/// A member of a chat room.
#[derive(Debug, Clone)]
pub struct ChatParticipant {
    /// Connection the member joined from.
    pub connection_id: ConnectionId,
    /// Display name, unique within the room.
    pub name: String,
}

impl ChatParticipant {
    /// Create a new participant.
    pub fn new(connection_id: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            connection_id,
            name: name.into(),
        }
    }
}

/// A room's members in join order.
#[derive(Debug, Clone, Default)]
pub struct ChatRoom {
    participants: Vec<ChatParticipant>,
}

impl ChatRoom {
    /// Create an empty room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the room has no participants.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participant names in join order.
    pub fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }

    /// Connection IDs of all participants.
    pub fn connection_ids(&self) -> impl Iterator<Item = &ConnectionId> {
        self.participants.iter().map(|p| &p.connection_id)
    }

    /// Check if a connection is in the room.
    pub fn is_participant(&self, connection_id: &ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| &p.connection_id == connection_id)
    }

    /// Check if `name` is held by a participant other than `except`.
    ///
    /// Comparison is exact and case-sensitive.
    pub fn is_name_taken(&self, name: &str, except: &ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.name == name && &p.connection_id != except)
    }

    /// Add a participant.
    ///
    /// Returns false if the connection is already in the room.
    pub fn join(&mut self, participant: ChatParticipant) -> bool {
        if self.is_participant(&participant.connection_id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Change a participant's display name, keeping its place in join order.
    ///
    /// Returns false if the connection is not in the room.
    pub fn rename(&mut self, connection_id: &ConnectionId, name: impl Into<String>) -> bool {
        match self
            .participants
            .iter_mut()
            .find(|p| &p.connection_id == connection_id)
        {
            Some(participant) => {
                participant.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Remove a participant.
    ///
    /// Returns the removed participant, or None if not in the room.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> Option<ChatParticipant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        Some(self.participants.remove(index))
    }
}
