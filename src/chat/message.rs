//! Chat messages stored in room history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::user::User;

/// Type of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Message typed by a user.
    Chat,
    /// Notice produced by the server.
    System,
}

impl MessageKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::System => "system",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable room message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Globally unique message ID.
    pub id: String,
    /// Message type.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Author snapshot at send time (None for system messages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Message body.
    pub content: String,
    /// Room the message was sent to.
    pub room_id: String,
    /// Timestamp when the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a chat message authored by `user`.
    pub fn chat(user: User, room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: MessageKind::Chat,
            user: Some(user),
            content: content.into(),
            room_id: room_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system message.
    pub fn system(room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: MessageKind::System,
            user: None,
            content: content.into(),
            room_id: room_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Display name of the author, empty for system messages.
    pub fn author_name(&self) -> &str {
        self.user.as_ref().map(|u| u.username.as_str()).unwrap_or("")
    }
}
