//! WebSocket frame types for chat communication.
//!
//! Requests carry an optional `id`; when present, the server answers with an
//! ack frame echoing it. Server-initiated events are sent as
//! `{"event": name, "data": payload}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::chat::{Ack, Request, ServerEvent};

/// A request frame sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestFrame {
    /// Correlation ID for the acknowledgement.
    #[serde(default)]
    pub id: Option<u64>,
    /// Request name.
    pub event: String,
    /// Request payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct CreateRoomPayload {
    room: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JoinRoomPayload {
    username: Option<String>,
    room: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SendMessagePayload {
    text: Option<String>,
}

/// Decode a payload, treating anything malformed as empty.
fn payload<T: DeserializeOwned + Default>(data: serde_json::Value) -> T {
    serde_json::from_value(data).unwrap_or_default()
}

impl RequestFrame {
    /// Convert the frame into a typed request.
    ///
    /// Returns None for unknown request names.
    pub fn into_request(self) -> Option<Request> {
        let request = match self.event.as_str() {
            "getRooms" => Request::GetRooms,
            "createRoom" => {
                let p: CreateRoomPayload = payload(self.data);
                Request::CreateRoom { room: p.room }
            }
            "joinRoom" => {
                let p: JoinRoomPayload = payload(self.data);
                Request::JoinRoom {
                    username: p.username,
                    room: p.room,
                }
            }
            "sendMessage" => {
                let p: SendMessagePayload = payload(self.data);
                Request::SendMessage { text: p.text }
            }
            "leaveRoom" => Request::LeaveRoom,
            _ => return None,
        };
        Some(request)
    }
}

/// A frame sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Acknowledgement of a request.
    Ack {
        /// ID of the acknowledged request.
        ack: u64,
        /// Acknowledgement payload.
        data: Ack,
    },
    /// Server-initiated event.
    Event(ServerEvent),
}

impl ServerFrame {
    /// Serialize to JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
