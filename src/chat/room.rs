//! Chat room definitions and per-room shared state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::connection::{Connection, ConnectionId};
use super::history::HistoryRing;
use crate::config::RoomConfig;

/// A chat room definition. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    /// Room ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Maximum number of occupants.
    pub max_users: usize,
    /// Whether the room is listed publicly.
    pub is_public: bool,
    /// Creator name.
    pub created_by: String,
}

impl Room {
    /// Whether `query` names this room by ID or display name, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.id.to_lowercase() == query || self.name.to_lowercase() == query
    }
}

impl From<&RoomConfig> for Room {
    fn from(config: &RoomConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            max_users: config.max_users,
            is_public: config.is_public,
            created_by: config.created_by.clone(),
        }
    }
}

/// Room listing entry with live occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// Room definition.
    pub room: Room,
    /// Number of current occupants.
    pub occupancy: usize,
}

/// Mutable state of a room, guarded by the room lock.
pub(crate) struct RoomInner {
    /// Connections present in the room.
    pub members: HashMap<ConnectionId, Arc<Connection>>,
    /// Recent messages.
    pub history: HistoryRing,
}

/// A room definition together with its lock-protected state.
///
/// Membership and history share one lock so that a message append and its
/// fan-out happen in a single critical section.
pub(crate) struct RoomState {
    pub room: Room,
    pub inner: Mutex<RoomInner>,
}

impl RoomState {
    pub fn new(room: Room, history_capacity: usize) -> Self {
        Self {
            room,
            inner: Mutex::new(RoomInner {
                members: HashMap::new(),
                history: HistoryRing::new(history_capacity),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.room.id
    }
}
