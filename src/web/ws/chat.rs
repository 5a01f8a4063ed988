//! Chat WebSocket handler.
//!
//! This module provides WebSocket handling for real-time chat communication.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::chat::{Ack, RoomRegistry, SessionHandler};

use super::messages::{RequestFrame, ServerFrame};

/// State for WebSocket chat handler.
#[derive(Clone)]
pub struct ChatWsState {
    /// Shared room registry.
    pub registry: Arc<RoomRegistry>,
}

impl ChatWsState {
    /// Create a new chat WebSocket state.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }
}

/// WebSocket chat handler.
///
/// GET /ws
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ChatWsState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<ChatWsState>) {
    let (mut handler, mut events) = SessionHandler::connect(Arc::clone(&state.registry)).await;
    let conn_id = handler.session().id();

    tracing::debug!("WebSocket session started: {}", conn_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            // Handle incoming WebSocket messages
            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text(&mut handler, &text).await {
                            if send_frame(&mut ws_sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("WebSocket closed by client: {}", conn_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            // Forward room and global events
            event = events.recv() => {
                let Some(event) = event else {
                    // Queue dropped by the dispatcher: this client fell behind
                    tracing::debug!("WebSocket event queue closed: {}", conn_id);
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                };
                if send_frame(&mut ws_sender, &ServerFrame::Event(event)).await.is_err() {
                    break;
                }
            }
        }
    }

    handler.disconnect().await;
    tracing::debug!("WebSocket session ended: {}", conn_id);
}

/// Decode a text frame, run the request, and build the ack frame.
///
/// Returns None when there is nothing to send back: the frame was not valid
/// JSON, carried no `id`, or the request goes unacknowledged.
async fn handle_text(handler: &mut SessionHandler, text: &str) -> Option<ServerFrame> {
    let frame: RequestFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!("Failed to parse client frame: {}", e);
            return None;
        }
    };

    let id = frame.id;
    let event = frame.event.clone();
    let ack = match frame.into_request() {
        Some(request) => handler.handle(request).await?,
        None => {
            tracing::debug!(event = %event, "Unknown client event");
            Ack::error("Unknown event")
        }
    };

    id.map(|id| ServerFrame::Ack { ack: id, data: ack })
}

/// Serialize and send a frame.
async fn send_frame(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    match frame.to_json() {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize server frame");
            Ok(())
        }
    }
}
