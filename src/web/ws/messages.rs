//! WebSocket message types for chat communication.
//!
//! Server-to-client frames are [`crate::chat::ServerEvent`].

use serde::Deserialize;

/// Messages sent from client to server.
///
/// Missing fields decode as empty strings so that the handler can answer
/// with a specific error instead of a generic format error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim a username.
    Register {
        /// Requested username.
        #[serde(default)]
        username: String,
    },
    /// Send a chat message or command.
    Message {
        /// Message content.
        #[serde(default)]
        content: String,
    },
    /// Move to another room.
    JoinRoom {
        /// Room ID to join.
        #[serde(default)]
        room_id: String,
    },
}
