//! Room registry for roomchat.
//!
//! The registry owns every room and the dispatcher for every connected
//! client. A single mutex guards both, so each operation reads membership,
//! mutates it, and enqueues the resulting events atomically. Events for a
//! room therefore reach its members in the order the operations completed.

use std::collections::BTreeMap;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::dispatch::{Dispatcher, EventReceiver};
use super::error::ChatError;
use super::event::{ChatMessage, ServerEvent, SystemMessage};
use super::format::format_message;
use super::room::{ChatParticipant, ChatRoom};
use super::session::{ConnectionId, Session};

/// Shared registry of rooms and connected clients.
///
/// Construct one per server and hand it to connections behind an `Arc`.
pub struct RoomRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    /// Rooms indexed by name.
    rooms: BTreeMap<String, ChatRoom>,
    /// Outbound queues of every connected client.
    dispatcher: Dispatcher,
}

impl RegistryState {
    fn room_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    fn broadcast_rooms(&mut self) {
        let rooms = self.room_names();
        self.dispatcher.send_all(&ServerEvent::RoomsList(rooms));
    }

    fn broadcast_to_room(&mut self, room_name: &str, event: ServerEvent) {
        if let Some(room) = self.rooms.get(room_name) {
            self.dispatcher.send_to(room.connection_ids(), &event);
        }
    }

    fn leave(&mut self, session: &mut Session) {
        let Some((room_name, username)) = session.take_membership() else {
            return;
        };

        let Some(room) = self.rooms.get_mut(&room_name) else {
            warn!(conn_id = %session.id(), room = %room_name, "session pointed at a missing room");
            return;
        };

        if room.leave(&session.id()).is_none() {
            warn!(conn_id = %session.id(), room = %room_name, "session was not a member of its room");
        }
        debug!(conn_id = %session.id(), room = %room_name, username = %username, "left room");

        if room.is_empty() {
            self.rooms.remove(&room_name);
            info!(room = %room_name, "room removed");
            self.broadcast_rooms();
        } else {
            let event = SystemMessage::leave(&username, room.participant_names());
            self.broadcast_to_room(&room_name, ServerEvent::SystemMessage(event));
        }
    }
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Create an empty registry whose connections may each have up to
    /// `capacity` undelivered events. A connection that falls further behind
    /// is evicted and its socket closed.
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                rooms: BTreeMap::new(),
                dispatcher: Dispatcher::with_capacity(capacity),
            }),
        }
    }

    /// Register a new connection.
    ///
    /// The connection immediately receives the current room list.
    pub async fn connect(&self) -> (Session, EventReceiver) {
        let id = ConnectionId::new();
        let mut state = self.state.lock().await;
        let events = state.dispatcher.register(id);
        let rooms = state.room_names();
        state
            .dispatcher
            .send_to([&id], &ServerEvent::RoomsList(rooms));
        info!(conn_id = %id, "client connected");
        (Session::new(id), events)
    }

    /// Remove a connection: leave its room, then stop delivering events to it.
    pub async fn disconnect(&self, session: &mut Session) {
        let mut state = self.state.lock().await;
        state.leave(session);
        state.dispatcher.unregister(&session.id());
        info!(conn_id = %session.id(), "client disconnected");
    }

    /// List room names in lexicographic order.
    pub async fn list_rooms(&self) -> Vec<String> {
        self.state.lock().await.room_names()
    }

    /// Get the number of rooms.
    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    /// Get the number of connected clients.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.dispatcher.client_count()
    }

    /// Member names of a room in join order, or None if the room doesn't exist.
    pub async fn room_members(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .await
            .rooms
            .get(name)
            .map(ChatRoom::participant_names)
    }

    /// Create a room.
    ///
    /// Creating a room that already exists is not an error. A newly created
    /// room is announced to every connected client.
    pub async fn create_room(&self, name: &str) -> Result<Vec<String>, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::InvalidName);
        }

        let mut state = self.state.lock().await;
        if !state.rooms.contains_key(name) {
            state.rooms.insert(name.to_string(), ChatRoom::new());
            info!(room = %name, "room created");
            state.broadcast_rooms();
        }
        Ok(state.room_names())
    }

    /// Join a room, creating it if needed.
    ///
    /// If the session is already in another room it leaves that room first.
    /// Joining its current room under a new name renames it in place. All
    /// members, including the joiner, are notified with the updated member
    /// list, which is also returned.
    pub async fn join_room(
        &self,
        session: &mut Session,
        username: &str,
        room_name: &str,
    ) -> Result<Vec<String>, ChatError> {
        let username = username.trim();
        let room_name = room_name.trim();
        if username.is_empty() || room_name.is_empty() {
            return Err(ChatError::MissingData);
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(room) = state.rooms.get_mut(room_name) {
            if room.is_name_taken(username, &session.id()) {
                return Err(ChatError::NameTaken);
            }
            if session.room() == Some(room_name) {
                if session.username() == Some(username) {
                    return Ok(room.participant_names());
                }
                if room.rename(&session.id(), username) {
                    let users = room.participant_names();
                    session.set_membership(room_name, username);
                    debug!(conn_id = %session.id(), room = %room_name, username = %username, "renamed in room");

                    let event = SystemMessage::join(username, users.clone());
                    state.broadcast_to_room(room_name, ServerEvent::SystemMessage(event));
                    return Ok(users);
                }
            }
        }

        state.leave(session);

        if !state.rooms.contains_key(room_name) {
            state
                .rooms
                .insert(room_name.to_string(), ChatRoom::new());
            info!(room = %room_name, "room created");
            state.broadcast_rooms();
        }

        let Some(room) = state.rooms.get_mut(room_name) else {
            return Err(ChatError::MissingData);
        };
        room.join(ChatParticipant::new(session.id(), username));
        session.set_membership(room_name, username);
        let users = room.participant_names();
        debug!(conn_id = %session.id(), room = %room_name, username = %username, "joined room");

        let event = SystemMessage::join(username, users.clone());
        state.broadcast_to_room(room_name, ServerEvent::SystemMessage(event));
        Ok(users)
    }

    /// Leave the current room, if any.
    ///
    /// Remaining members are notified; an emptied room is removed and the
    /// new room list is announced to every connected client.
    pub async fn leave(&self, session: &mut Session) {
        self.state.lock().await.leave(session);
    }

    /// Send a chat message to the session's room.
    ///
    /// Blank text is silently ignored.
    pub async fn send_message(&self, session: &Session, raw: &str) -> Result<(), ChatError> {
        if raw.trim().is_empty() {
            return Ok(());
        }
        let (Some(room_name), Some(username)) = (session.room(), session.username()) else {
            return Err(ChatError::NotJoined);
        };

        let html = format_message(raw);
        let mut state = self.state.lock().await;
        if !state.rooms.contains_key(room_name) {
            return Err(ChatError::NotJoined);
        }
        state.broadcast_to_room(room_name, ServerEvent::Message(ChatMessage::new(username, html)));
        Ok(())
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(events: &mut EventReceiver) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_registry_new() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(registry.connection_count().await, 0);
        assert!(registry.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_connect_sends_room_list() {
        let registry = RoomRegistry::new();
        registry.create_room("lobby").await.unwrap();

        let (session, mut events) = registry.connect().await;
        assert!(!session.is_joined());
        assert_eq!(
            drain(&mut events),
            vec![ServerEvent::RoomsList(vec!["lobby".to_string()])]
        );
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_room() {
        let registry = RoomRegistry::new();

        let rooms = registry.create_room(" test ").await.unwrap();
        assert_eq!(rooms, vec!["test"]);

        // Duplicate is not an error
        let rooms = registry.create_room("test").await.unwrap();
        assert_eq!(rooms, vec!["test"]);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_room_invalid_name() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.create_room("").await, Err(ChatError::InvalidName));
        assert_eq!(registry.create_room(" \t ").await, Err(ChatError::InvalidName));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_room_broadcasts_only_when_new() {
        let registry = RoomRegistry::new();
        let (_session, mut events) = registry.connect().await;
        drain(&mut events);

        registry.create_room("lobby").await.unwrap();
        assert_eq!(
            drain(&mut events),
            vec![ServerEvent::RoomsList(vec!["lobby".to_string()])]
        );

        registry.create_room("lobby").await.unwrap();
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_list_rooms_sorted() {
        let registry = RoomRegistry::new();
        registry.create_room("room-b").await.unwrap();
        registry.create_room("room-a").await.unwrap();

        assert_eq!(registry.list_rooms().await, vec!["room-a", "room-b"]);
    }

    #[tokio::test]
    async fn test_join_room_creates_room() {
        let registry = RoomRegistry::new();
        let (mut session, mut events) = registry.connect().await;
        drain(&mut events);

        let users = registry
            .join_room(&mut session, " alice ", " lobby ")
            .await
            .unwrap();
        assert_eq!(users, vec!["alice"]);
        assert_eq!(session.room(), Some("lobby"));
        assert_eq!(session.username(), Some("alice"));

        let received = drain(&mut events);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], ServerEvent::RoomsList(vec!["lobby".to_string()]));
        match &received[1] {
            ServerEvent::SystemMessage(msg) => {
                assert_eq!(msg.text, "alice joined.");
                assert_eq!(msg.users, vec!["alice"]);
            }
            other => panic!("Expected SystemMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_join_room_missing_data() {
        let registry = RoomRegistry::new();
        let (mut session, _events) = registry.connect().await;

        assert_eq!(
            registry.join_room(&mut session, "  ", "lobby").await,
            Err(ChatError::MissingData)
        );
        assert_eq!(
            registry.join_room(&mut session, "alice", "").await,
            Err(ChatError::MissingData)
        );
        assert!(!session.is_joined());
    }

    #[tokio::test]
    async fn test_join_room_name_taken() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (mut other, _o) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        assert_eq!(
            registry.join_room(&mut other, " alice", "lobby").await,
            Err(ChatError::NameTaken)
        );
        assert!(!other.is_joined());

        // Case-sensitive
        assert!(registry.join_room(&mut other, "Alice", "lobby").await.is_ok());
        assert_eq!(
            registry.room_members("lobby").await.unwrap(),
            vec!["alice", "Alice"]
        );
    }

    #[tokio::test]
    async fn test_same_name_in_different_rooms() {
        let registry = RoomRegistry::new();
        let (mut a, _a) = registry.connect().await;
        let (mut b, _b) = registry.connect().await;

        registry.join_room(&mut a, "alice", "one").await.unwrap();
        registry.join_room(&mut b, "alice", "two").await.unwrap();
        assert_eq!(registry.list_rooms().await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_join_other_room_leaves_current() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (mut bob, mut bob_events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "one").await.unwrap();
        registry.join_room(&mut bob, "bob", "one").await.unwrap();
        drain(&mut bob_events);

        registry.join_room(&mut alice, "alice", "two").await.unwrap();
        assert_eq!(alice.room(), Some("two"));
        assert_eq!(registry.room_members("one").await.unwrap(), vec!["bob"]);
        assert_eq!(registry.room_members("two").await.unwrap(), vec!["alice"]);

        let received = drain(&mut bob_events);
        assert!(received.iter().any(|e| matches!(
            e,
            ServerEvent::SystemMessage(msg) if msg.text == "alice left." && msg.users == vec!["bob"]
        )));
    }

    #[tokio::test]
    async fn test_rejoin_same_room_same_name_is_noop() {
        let registry = RoomRegistry::new();
        let (mut alice, mut events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        drain(&mut events);

        let users = registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        assert_eq!(users, vec!["alice"]);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_rename_in_current_room_keeps_room() {
        let registry = RoomRegistry::new();
        let (mut alice, mut alice_events) = registry.connect().await;
        let (_watcher, mut watcher_events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        drain(&mut alice_events);
        drain(&mut watcher_events);

        let users = registry
            .join_room(&mut alice, "alice2", "lobby")
            .await
            .unwrap();
        assert_eq!(users, vec!["alice2"]);
        assert_eq!(alice.username(), Some("alice2"));
        assert_eq!(registry.list_rooms().await, vec!["lobby"]);

        // The room never went away, so nobody hears about the room list
        assert!(drain(&mut watcher_events).is_empty());
        match drain(&mut alice_events).as_slice() {
            [ServerEvent::SystemMessage(msg)] => {
                assert_eq!(msg.text, "alice2 joined.");
                assert_eq!(msg.users, vec!["alice2"]);
            }
            other => panic!("Expected one SystemMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rename_keeps_join_order_and_frees_old_name() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (mut bob, mut bob_events) = registry.connect().await;
        let (mut carol, _c) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        registry.join_room(&mut bob, "bob", "lobby").await.unwrap();
        drain(&mut bob_events);

        registry.join_room(&mut alice, "alicia", "lobby").await.unwrap();
        assert_eq!(
            registry.room_members("lobby").await.unwrap(),
            vec!["alicia", "bob"]
        );
        assert_eq!(drain(&mut bob_events).len(), 1);

        // Renaming onto another member's name is still rejected
        assert_eq!(
            registry.join_room(&mut alice, "bob", "lobby").await,
            Err(ChatError::NameTaken)
        );
        assert_eq!(alice.username(), Some("alicia"));

        // The old name is free again
        registry.join_room(&mut carol, "alice", "lobby").await.unwrap();
        assert_eq!(
            registry.room_members("lobby").await.unwrap(),
            vec!["alicia", "bob", "alice"]
        );
    }

    #[tokio::test]
    async fn test_join_taken_name_keeps_current_room() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (mut bob, _b) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "one").await.unwrap();
        registry.join_room(&mut bob, "alice", "two").await.unwrap();

        assert_eq!(
            registry.join_room(&mut bob, "alice", "one").await,
            Err(ChatError::NameTaken)
        );
        assert_eq!(bob.room(), Some("two"));
        assert_eq!(registry.room_members("two").await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_members() {
        let registry = RoomRegistry::new();
        let (mut alice, mut alice_events) = registry.connect().await;
        let (mut bob, _b) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        registry.join_room(&mut bob, "bob", "lobby").await.unwrap();
        drain(&mut alice_events);

        registry.leave(&mut bob).await;
        assert!(!bob.is_joined());

        let received = drain(&mut alice_events);
        assert_eq!(received.len(), 1);
        match &received[0] {
            ServerEvent::SystemMessage(msg) => {
                assert_eq!(msg.text, "bob left.");
                assert_eq!(msg.users, vec!["alice"]);
            }
            other => panic!("Expected SystemMessage, got {other:?}"),
        }
        assert_eq!(registry.list_rooms().await, vec!["lobby"]);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (mut bob, mut bob_events) = registry.connect().await;

        // Never joined
        registry.leave(&mut alice).await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        registry.join_room(&mut bob, "bob", "lobby").await.unwrap();
        drain(&mut bob_events);

        registry.leave(&mut alice).await;
        registry.leave(&mut alice).await;

        let left_events = drain(&mut bob_events)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::SystemMessage(_)))
            .count();
        assert_eq!(left_events, 1);
    }

    #[tokio::test]
    async fn test_last_leave_removes_room() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (_watcher, mut watcher_events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        drain(&mut watcher_events);

        registry.leave(&mut alice).await;
        assert!(registry.list_rooms().await.is_empty());
        assert!(registry.room_members("lobby").await.is_none());
        assert_eq!(
            drain(&mut watcher_events),
            vec![ServerEvent::RoomsList(vec![])]
        );
    }

    #[tokio::test]
    async fn test_send_message() {
        let registry = RoomRegistry::new();
        let (mut alice, mut alice_events) = registry.connect().await;
        let (mut bob, mut bob_events) = registry.connect().await;
        let (_outsider, mut outsider_events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        registry.join_room(&mut bob, "bob", "lobby").await.unwrap();
        drain(&mut alice_events);
        drain(&mut bob_events);
        drain(&mut outsider_events);

        registry.send_message(&alice, "**hi**").await.unwrap();

        for events in [&mut alice_events, &mut bob_events] {
            match drain(events).as_slice() {
                [ServerEvent::Message(msg)] => {
                    assert_eq!(msg.from, "alice");
                    assert_eq!(msg.html, "<strong>hi</strong>");
                }
                other => panic!("Expected one Message, got {other:?}"),
            }
        }
        assert!(drain(&mut outsider_events).is_empty());
    }

    #[tokio::test]
    async fn test_send_message_not_joined() {
        let registry = RoomRegistry::new();
        let (session, _events) = registry.connect().await;

        assert_eq!(
            registry.send_message(&session, "hello").await,
            Err(ChatError::NotJoined)
        );
    }

    #[tokio::test]
    async fn test_send_blank_message_is_noop() {
        let registry = RoomRegistry::new();
        let (mut alice, mut events) = registry.connect().await;
        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        drain(&mut events);

        assert_eq!(registry.send_message(&alice, "  \n ").await, Ok(()));
        assert!(drain(&mut events).is_empty());

        // Blank text from a connection outside any room is also a no-op
        let (outsider, _o) = registry.connect().await;
        assert_eq!(registry.send_message(&outsider, "").await, Ok(()));
    }

    #[tokio::test]
    async fn test_lagging_connection_is_evicted() {
        let registry = RoomRegistry::with_queue_capacity(4);
        let (mut alice, mut alice_events) = registry.connect().await;
        let (mut bob, mut bob_events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        registry.join_room(&mut bob, "bob", "lobby").await.unwrap();
        drain(&mut alice_events);

        // Bob never reads; alice keeps up
        for i in 0..8 {
            registry.send_message(&alice, &format!("msg {i}")).await.unwrap();
            assert_eq!(drain(&mut alice_events).len(), 1);
        }
        assert_eq!(registry.connection_count().await, 1);

        // Bob's queue holds what fit, then reports the close
        let mut received = 0;
        while bob_events.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 4);

        // His task then disconnects, which still cleans up the room
        registry.disconnect(&mut bob).await;
        assert_eq!(registry.room_members("lobby").await.unwrap(), vec!["alice"]);
        match drain(&mut alice_events).as_slice() {
            [ServerEvent::SystemMessage(msg)] => assert_eq!(msg.text, "bob left."),
            other => panic!("Expected one SystemMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disconnect_leaves_and_unregisters() {
        let registry = RoomRegistry::new();
        let (mut alice, _a) = registry.connect().await;
        let (mut bob, mut bob_events) = registry.connect().await;

        registry.join_room(&mut alice, "alice", "lobby").await.unwrap();
        registry.join_room(&mut bob, "bob", "lobby").await.unwrap();
        drain(&mut bob_events);

        registry.disconnect(&mut alice).await;
        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.room_members("lobby").await.unwrap(), vec!["bob"]);
        assert_eq!(drain(&mut bob_events).len(), 1);

        // Disconnecting twice is harmless
        registry.disconnect(&mut alice).await;
        assert_eq!(registry.connection_count().await, 1);
    }
}
