//! Registered chat users.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use serde::Serialize;

/// Avatar colors handed out at registration.
pub const AVATAR_COLORS: &[&str] = &[
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF", "#5F27CD",
    "#00D2D3", "#FF9F43",
];

/// Pick a random avatar color.
pub fn random_avatar() -> &'static str {
    AVATAR_COLORS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(AVATAR_COLORS[0])
}

/// The identity bound to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// User ID (the connection ID).
    pub id: String,
    /// Display name.
    pub username: String,
    /// Avatar color tag.
    pub avatar: String,
    /// Registration timestamp.
    pub joined_at: DateTime<Utc>,
    /// Room the user currently occupies.
    pub current_room: Option<String>,
}

impl User {
    /// Create a new user that is not in any room yet.
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar: avatar.into(),
            joined_at: Utc::now(),
            current_room: None,
        }
    }
}

/// Case-folded key used for name uniqueness.
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}
