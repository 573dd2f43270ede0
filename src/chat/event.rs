//! Events sent from the server to clients.

use serde::Serialize;

use super::message::Message;
use super::room::Room;
use super::user::User;

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Outcome of a registration request.
    RegistrationResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<User>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Outcome of a join request.
    JoinResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<Room>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Recent room history, sent privately after a join.
    MessageHistory {
        messages: Vec<Message>,
        room_id: String,
    },
    /// A message posted to the room.
    NewMessage { message: Message },
    /// User entered the room.
    UserJoined {
        user: User,
        room_id: String,
        timestamp: String,
    },
    /// User left the room.
    UserLeft {
        user: User,
        room_id: String,
        timestamp: String,
    },
    /// User changed their name.
    UserRenamed {
        old_name: String,
        new_name: String,
        user: User,
        room_id: String,
        timestamp: String,
    },
    /// Private notice for one connection.
    SystemMessage { content: String, timestamp: String },
    /// Error message.
    Error { message: String },
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl ServerEvent {
    /// Create a user joined event.
    pub fn user_joined(user: User, room_id: impl Into<String>) -> Self {
        Self::UserJoined {
            user,
            room_id: room_id.into(),
            timestamp: now(),
        }
    }

    /// Create a user left event.
    pub fn user_left(user: User, room_id: impl Into<String>) -> Self {
        Self::UserLeft {
            user,
            room_id: room_id.into(),
            timestamp: now(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::SystemMessage {
            content: content.into(),
            timestamp: now(),
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Create a registration result from a manager outcome.
    pub fn registration(result: Result<User, crate::ChatError>) -> Self {
        match result {
            Ok(user) => Self::RegistrationResult {
                success: true,
                user: Some(user),
                error: None,
            },
            Err(e) => Self::RegistrationResult {
                success: false,
                user: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Create a join result from a manager outcome.
    pub fn join(result: Result<Room, crate::ChatError>) -> Self {
        match result {
            Ok(room) => Self::JoinResult {
                success: true,
                room: Some(room),
                error: None,
            },
            Err(e) => Self::JoinResult {
                success: false,
                room: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_frame(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize server event");
                None
            }
        }
    }
}
