//! Chat module for roomchat.
//!
//! This module provides the room/session coordination layer:
//! - Room registry with per-room username uniqueness
//! - Per-connection sessions and request handling
//! - Room-scoped and global event fan-out
//! - Message formatting (HTML escaping, light markup, links)

mod dispatch;
mod error;
mod event;
mod format;
mod registry;
mod room;
mod session;

pub use dispatch::{Dispatcher, EventReceiver, EventSender, QUEUE_CAPACITY};
pub use error::ChatError;
pub use event::{ChatMessage, ServerEvent, SystemMessage};
pub use format::{escape_html, format_message};
pub use registry::RoomRegistry;
pub use room::{ChatParticipant, ChatRoom};
pub use session::{Ack, ConnectionId, Request, Session, SessionHandler};
