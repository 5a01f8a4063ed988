//! roomchat - real-time multi-room chat server
//!
//! Clients connect over WebSocket, list or create rooms, join a room under a
//! display name, and exchange messages with everyone in that room.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

pub use chat::{
    format_message, Ack, ChatError, ConnectionId, Request, RoomRegistry, ServerEvent, Session,
    SessionHandler,
};
pub use config::Config;
pub use error::{Result, RoomchatError};
pub use web::WebServer;
