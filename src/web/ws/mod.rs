//! WebSocket module for real-time communication.
//!
//! This module provides the chat transport: one task per socket that feeds
//! client requests to a session handler and forwards room events back.

pub mod chat;
pub mod messages;

pub use chat::{chat_ws_handler, ChatWsState};
pub use messages::{RequestFrame, ServerFrame};
