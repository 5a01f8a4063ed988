//! Event fan-out to connected clients.
//!
//! Every connection owns a bounded queue; the dispatcher holds the sending
//! halves. Enqueueing never blocks and never performs socket I/O, so it is
//! safe to call while the registry lock is held. The connection's own task
//! drains the receiving half into its socket.
//!
//! A connection whose queue is full has stopped keeping up with its room.
//! Rather than drop events from the middle of its stream, the dispatcher
//! evicts it: the sending half is removed, the receiver observes the close,
//! and the connection's task shuts the socket down.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::event::ServerEvent;
use super::session::ConnectionId;

/// Default number of undelivered events a connection may have queued.
pub const QUEUE_CAPACITY: usize = 1024;

/// Sending half of a connection's event queue.
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Receiving half of a connection's event queue.
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

enum Delivery {
    Queued,
    Dropped,
    Lagging,
}

/// Delivers events to a chosen set of connections or to all of them.
#[derive(Debug)]
pub struct Dispatcher {
    /// Connected clients indexed by connection ID.
    clients: HashMap<ConnectionId, EventSender>,
    /// Per-connection queue capacity.
    capacity: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty dispatcher whose queues hold `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            clients: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a connection and return the receiver for its events.
    pub fn register(&mut self, id: ConnectionId) -> EventReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.clients.insert(id, tx);
        rx
    }

    /// Remove a connection.
    ///
    /// Returns true if the connection was registered.
    pub fn unregister(&mut self, id: &ConnectionId) -> bool {
        self.clients.remove(id).is_some()
    }

    /// Number of registered connections.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Deliver an event to the given connections.
    ///
    /// Returns the number of connections the event was queued for.
    pub fn send_to<'a, I>(&mut self, ids: I, event: &ServerEvent) -> usize
    where
        I: IntoIterator<Item = &'a ConnectionId>,
    {
        let mut delivered = 0;
        let mut lagging = Vec::new();
        for id in ids {
            match self.send_one(id, event) {
                Delivery::Queued => delivered += 1,
                Delivery::Lagging => lagging.push(*id),
                Delivery::Dropped => {}
            }
        }
        self.evict(lagging);
        debug!(event = event.name(), delivered, "room broadcast");
        delivered
    }

    /// Deliver an event to every registered connection.
    ///
    /// Returns the number of connections the event was queued for.
    pub fn send_all(&mut self, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut lagging = Vec::new();
        for id in self.clients.keys() {
            match self.send_one(id, event) {
                Delivery::Queued => delivered += 1,
                Delivery::Lagging => lagging.push(*id),
                Delivery::Dropped => {}
            }
        }
        self.evict(lagging);
        debug!(event = event.name(), delivered, "global broadcast");
        delivered
    }

    fn send_one(&self, id: &ConnectionId, event: &ServerEvent) -> Delivery {
        let Some(tx) = self.clients.get(id) else {
            debug!(conn_id = %id, event = event.name(), "unknown connection, event dropped");
            return Delivery::Dropped;
        };
        match tx.try_send(event.clone()) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Lagging,
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = %id, event = event.name(), "receiver closed, event dropped");
                Delivery::Dropped
            }
        }
    }

    fn evict(&mut self, lagging: Vec<ConnectionId>) {
        for id in lagging {
            warn!(conn_id = %id, capacity = self.capacity, "event queue full, evicting connection");
            self.clients.remove(&id);
        }
    }
}
