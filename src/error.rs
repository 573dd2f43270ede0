//! Error types for PAMPA Chat.

use thiserror::Error;

/// Error returned by chat manager operations.
///
/// Every variant is recoverable at the session boundary: it is reported to
/// the originating connection and never broadcast.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatError {
    /// The connection has not registered a user yet.
    #[error("user not registered")]
    NotRegistered,

    /// The connection already has a registered user.
    #[error("user already registered")]
    AlreadyRegistered,

    /// Another active user holds this name (case-insensitive).
    #[error("username already in use")]
    NameTaken,

    /// The requested name is empty.
    #[error("username required")]
    InvalidName,

    /// No room with the given id exists.
    #[error("room not found")]
    RoomNotFound,

    /// The target room is at capacity.
    #[error("room is full")]
    RoomFull,

    /// The user is not in a valid room.
    #[error("you are not in a valid room")]
    NoRoom,

    /// The connection is no longer reachable.
    #[error("connection closed")]
    TransportFailure,
}

/// Common error type for PAMPA Chat.
#[derive(Error, Debug)]
pub enum PampaError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration or user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat error surfaced outside a session.
    #[error("chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Result type alias for PAMPA Chat operations.
pub type Result<T> = std::result::Result<T, PampaError>;
