//! Web module for roomchat.
//!
//! This module provides the HTTP server, the chat WebSocket endpoint, and
//! optional static file serving for a browser front-end.

pub mod cors;
pub mod router;
pub mod server;
pub mod ws;

pub use router::create_router;
pub use server::WebServer;
