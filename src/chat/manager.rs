//! Connection and room manager for PAMPA Chat.
//!
//! [`ChatManager`] owns every piece of shared chat state: active
//! connections, registered users, room membership and room history.
//!
//! Locking discipline:
//! - each room has one lock covering its membership set and history, so an
//!   append and its fan-out form a single critical section and unrelated
//!   rooms never contend;
//! - each connection has a state lock (its user record) and an operation lock
//!   that serializes that connection's own register/join/send calls;
//! - the name index lock covers registration, rename and name release.
//!
//! Locks are always taken in the order: operation lock, name index, room
//! locks in ascending ID order, connection state. Teardown never takes the
//! operation lock, so a teardown triggered by another connection's broadcast
//! cannot deadlock. No lock is held across transport I/O: delivery only
//! enqueues onto a bounded per-connection queue.

use std::collections::HashMap;
use std::sync::Arc;

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;

use super::command::{format_help, parse_input, ChatCommand, ChatInput};
use super::connection::{Connection, ConnectionId, Outbound};
use super::event::ServerEvent;
use super::message::Message;
use super::room::{Room, RoomInfo, RoomInner, RoomState};
use super::user::{name_key, random_avatar, User};
use crate::config::{ChatConfig, Config, RoomConfig};
use crate::ChatError;

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result type for chat manager operations.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Outcome of [`ChatManager::send_message`].
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// A chat message was stored and broadcast.
    Chat(Message),
    /// The text was a command and has been executed.
    Command(ChatCommand),
}

/// Manager for connections, users and rooms.
///
/// This is shared across all sessions behind an `Arc`.
pub struct ChatManager {
    /// Room every user joins after registering.
    default_room: String,
    /// Messages replayed on join.
    history_replay: usize,
    /// Rooms indexed by ID. Fixed at construction.
    rooms: HashMap<String, Arc<RoomState>>,
    /// Room IDs in configuration order.
    room_order: Vec<String>,
    /// Active connections.
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    /// Case-folded username -> owning connection.
    names: Mutex<HashMap<String, ConnectionId>>,
}

impl ChatManager {
    /// Create a manager with the given chat settings and rooms.
    pub fn new(chat: &ChatConfig, rooms: &[RoomConfig]) -> Self {
        let mut by_id = HashMap::new();
        let mut room_order = Vec::new();
        for config in rooms {
            if by_id.contains_key(&config.id) {
                tracing::warn!(room_id = %config.id, "Ignoring duplicate room definition");
                continue;
            }
            let state = RoomState::new(Room::from(config), chat.history_capacity);
            room_order.push(config.id.clone());
            by_id.insert(config.id.clone(), Arc::new(state));
        }

        Self {
            default_room: chat.default_room.clone(),
            history_replay: chat.history_replay,
            rooms: by_id,
            room_order,
            connections: RwLock::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
        }
    }

    /// Create a manager from the full application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.chat, &config.rooms)
    }

    /// Create a manager with the default settings and seed rooms.
    pub fn with_defaults() -> Self {
        Self::from_config(&Config::default())
    }

    /// Register a newly accepted connection and return its ID.
    pub async fn accept(&self, outbound: Outbound) -> ConnectionId {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = Arc::new(Connection::new(id.clone(), outbound));
        self.connections.write().await.insert(id.clone(), conn);
        tracing::info!(connection_id = %id, "Connection accepted");
        id
    }

    /// Tear down a connection.
    ///
    /// Removes it from the active set and from its room, broadcasts
    /// `user_left` there and releases its username. Idempotent: returns
    /// `true` only for the call that performed the teardown.
    pub async fn teardown(&self, connection_id: &str) -> bool {
        let mut performed = false;
        let mut pending = vec![connection_id.to_string()];

        while let Some(id) = pending.pop() {
            let Some(conn) = self.connections.write().await.remove(&id) else {
                continue;
            };
            if id == connection_id {
                performed = true;
            }

            let (user, failed) = self.detach(&conn).await;
            match user {
                Some(user) => {
                    let mut names = self.names.lock().await;
                    let key = name_key(&user.username);
                    if names.get(&key).map(String::as_str) == Some(conn.id()) {
                        names.remove(&key);
                    }
                    tracing::info!(
                        connection_id = %id,
                        username = %user.username,
                        "Connection torn down"
                    );
                }
                None => tracing::info!(connection_id = %id, "Connection torn down"),
            }

            // Recipients that failed the user_left broadcast go next.
            pending.extend(failed);
        }

        performed
    }

    /// Remove a connection from its room and deactivate it.
    ///
    /// Returns the user record (if any) and the members whose delivery of
    /// `user_left` failed.
    async fn detach(&self, conn: &Arc<Connection>) -> (Option<User>, Vec<ConnectionId>) {
        loop {
            let current = current_room(&*conn.state.lock().await);
            let room = current
                .as_deref()
                .and_then(|id| self.rooms.get(id))
                .cloned();

            let mut inner = match &room {
                Some(room) => Some(room.inner.lock().await),
                None => None,
            };
            let mut state = conn.state.lock().await;

            // A join may have moved the user while we waited for the room lock.
            if current_room(&state) != current {
                continue;
            }

            if let Some(inner) = inner.as_mut() {
                inner.members.remove(conn.id());
            }
            state.active = false;
            let user = state.user.take();
            drop(state);

            let failed = match (&inner, &room, &user) {
                (Some(inner), Some(room), Some(user)) => {
                    fan_out(inner, &ServerEvent::user_left(user.clone(), room.id()))
                }
                _ => Vec::new(),
            };
            return (user, failed);
        }
    }

    async fn teardown_all(&self, ids: Vec<ConnectionId>) {
        for id in ids {
            tracing::warn!(connection_id = %id, "Delivery failed, tearing down connection");
            self.teardown(&id).await;
        }
    }

    async fn connection(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    /// Send an event privately to one connection.
    ///
    /// Returns `false` if the connection is unknown or the delivery failed;
    /// a failed delivery tears the connection down.
    pub async fn send_to(&self, connection_id: &str, event: &ServerEvent) -> bool {
        let Some(conn) = self.connection(connection_id).await else {
            return false;
        };
        let Some(frame) = event.to_frame() else {
            return false;
        };
        if conn.deliver(&frame).is_ok() {
            return true;
        }
        self.teardown_all(vec![conn.id().to_string()]).await;
        false
    }

    /// Register a username for a connection and join the default room.
    pub async fn register(&self, connection_id: &str, username: &str) -> ChatResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ChatError::InvalidName);
        }
        let conn = self
            .connection(connection_id)
            .await
            .ok_or(ChatError::TransportFailure)?;
        let _op = conn.ops.lock().await;

        {
            let mut names = self.names.lock().await;
            let mut state = conn.state.lock().await;
            if !state.active {
                return Err(ChatError::TransportFailure);
            }
            if state.user.is_some() {
                return Err(ChatError::AlreadyRegistered);
            }
            let key = name_key(username);
            if names.contains_key(&key) {
                return Err(ChatError::NameTaken);
            }
            names.insert(key, conn.id().to_string());
            state.user = Some(User::new(conn.id(), username, random_avatar()));
        }
        tracing::info!(connection_id = %conn.id(), username = %username, "User registered");

        if let Err(e) = self.join_locked(&conn, &self.default_room).await {
            tracing::warn!(
                connection_id = %conn.id(),
                room_id = %self.default_room,
                error = %e,
                "Could not join default room"
            );
        }

        let state = conn.state.lock().await;
        state.user.clone().ok_or(ChatError::TransportFailure)
    }

    /// Move a registered connection into a room.
    pub async fn join_room(&self, connection_id: &str, room_id: &str) -> ChatResult<Room> {
        let conn = self
            .connection(connection_id)
            .await
            .ok_or(ChatError::NotRegistered)?;
        let _op = conn.ops.lock().await;
        self.join_locked(&conn, room_id).await
    }

    /// Join logic; the caller holds the connection's operation lock.
    async fn join_locked(&self, conn: &Arc<Connection>, room_id: &str) -> ChatResult<Room> {
        let current = {
            let state = conn.state.lock().await;
            let user = state.user.as_ref().ok_or(ChatError::NotRegistered)?;
            user.current_room.clone()
        };
        let target = self
            .rooms
            .get(room_id)
            .cloned()
            .ok_or(ChatError::RoomNotFound)?;
        let previous = current
            .as_deref()
            .filter(|id| *id != target.id())
            .and_then(|id| self.rooms.get(id))
            .cloned();

        let (mut target_inner, mut previous_inner) = lock_pair(&target, previous.as_deref()).await;
        let mut state = conn.state.lock().await;
        if !state.active {
            return Err(ChatError::NotRegistered);
        }
        let user = state.user.as_mut().ok_or(ChatError::NotRegistered)?;

        let already_here = user.current_room.as_deref() == Some(target.id());
        if !already_here && target_inner.members.len() >= target.room.max_users {
            return Err(ChatError::RoomFull);
        }

        if let Some(inner) = previous_inner.as_mut() {
            inner.members.remove(conn.id());
        }
        target_inner
            .members
            .insert(conn.id().to_string(), Arc::clone(conn));
        user.current_room = Some(target.id().to_string());
        let snapshot = user.clone();
        drop(state);

        let mut failed = Vec::new();
        if let (Some(inner), Some(room)) = (previous_inner.as_ref(), previous.as_ref()) {
            failed.extend(fan_out(inner, &ServerEvent::user_left(snapshot.clone(), room.id())));
        }
        drop(previous_inner);

        if !already_here {
            failed.extend(fan_out(
                &target_inner,
                &ServerEvent::user_joined(snapshot, target.id()),
            ));
        }

        let history = ServerEvent::MessageHistory {
            messages: target_inner.history.recent(self.history_replay),
            room_id: target.id().to_string(),
        };
        if let Some(frame) = history.to_frame() {
            if conn.deliver(&frame).is_err() {
                failed.push(conn.id().to_string());
            }
        }
        drop(target_inner);

        tracing::info!(connection_id = %conn.id(), room_id = %target.id(), "Joined room");
        self.teardown_all(failed).await;
        Ok(target.room.clone())
    }

    /// Rename a registered user.
    pub async fn rename(&self, connection_id: &str, new_name: &str) -> ChatResult<User> {
        let conn = self
            .connection(connection_id)
            .await
            .ok_or(ChatError::NotRegistered)?;
        let _op = conn.ops.lock().await;
        self.rename_locked(&conn, new_name).await
    }

    async fn rename_locked(&self, conn: &Arc<Connection>, new_name: &str) -> ChatResult<User> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ChatError::InvalidName);
        }

        let (old_name, snapshot) = {
            let mut names = self.names.lock().await;
            let mut state = conn.state.lock().await;
            if !state.active {
                return Err(ChatError::NotRegistered);
            }
            let user = state.user.as_mut().ok_or(ChatError::NotRegistered)?;

            let key = name_key(new_name);
            if names.get(&key).is_some_and(|owner| owner != conn.id()) {
                return Err(ChatError::NameTaken);
            }
            names.remove(&name_key(&user.username));
            names.insert(key, conn.id().to_string());
            let old_name = std::mem::replace(&mut user.username, new_name.to_string());
            (old_name, user.clone())
        };
        tracing::info!(
            connection_id = %conn.id(),
            old_name = %old_name,
            new_name = %new_name,
            "User renamed"
        );

        if let Some(room_id) = snapshot.current_room.clone() {
            let event = ServerEvent::UserRenamed {
                old_name,
                new_name: new_name.to_string(),
                user: snapshot.clone(),
                room_id: room_id.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            self.broadcast_to_room(&room_id, &event).await;
        }
        Ok(snapshot)
    }

    /// Post text to the sender's current room, or run it as a command.
    pub async fn send_message(&self, connection_id: &str, text: &str) -> ChatResult<SendOutcome> {
        let conn = self
            .connection(connection_id)
            .await
            .ok_or(ChatError::NotRegistered)?;
        let _op = conn.ops.lock().await;

        let user = {
            let state = conn.state.lock().await;
            state.user.clone().ok_or(ChatError::NotRegistered)?
        };
        let room = user
            .current_room
            .as_deref()
            .and_then(|id| self.rooms.get(id))
            .cloned()
            .ok_or(ChatError::NoRoom)?;

        let content = match parse_input(text) {
            ChatInput::Command(command) => {
                self.execute(&conn, &room, command.clone()).await;
                return Ok(SendOutcome::Command(command));
            }
            ChatInput::Message(content) => content,
        };

        let mut inner = room.inner.lock().await;
        if !inner.members.contains_key(conn.id()) {
            return Err(ChatError::NoRoom);
        }
        let message = Message::chat(user, room.id(), content);
        inner.history.push(message.clone());
        let failed = fan_out(
            &inner,
            &ServerEvent::NewMessage {
                message: message.clone(),
            },
        );
        drop(inner);

        tracing::debug!(connection_id = %conn.id(), room_id = %room.id(), "Message posted");
        self.teardown_all(failed).await;
        Ok(SendOutcome::Chat(message))
    }

    /// Post a system message to a room.
    pub async fn announce(&self, room_id: &str, content: &str) -> ChatResult<Message> {
        let room = self.rooms.get(room_id).ok_or(ChatError::RoomNotFound)?;

        let mut inner = room.inner.lock().await;
        let message = Message::system(room.id(), content);
        inner.history.push(message.clone());
        let failed = fan_out(
            &inner,
            &ServerEvent::NewMessage {
                message: message.clone(),
            },
        );
        drop(inner);

        self.teardown_all(failed).await;
        Ok(message)
    }

    /// Post a system message to every room.
    pub async fn announce_all(&self, content: &str) {
        for room_id in &self.room_order {
            let _ = self.announce(room_id, content).await;
        }
    }

    /// Deliver an event to every member of a room.
    ///
    /// Returns the number of successful deliveries. Members whose delivery
    /// failed are torn down after the pass.
    pub async fn broadcast_to_room(&self, room_id: &str, event: &ServerEvent) -> usize {
        let Some(room) = self.rooms.get(room_id) else {
            return 0;
        };
        let inner = room.inner.lock().await;
        let failed = fan_out(&inner, event);
        let delivered = inner.members.len() - failed.len();
        drop(inner);

        self.teardown_all(failed).await;
        delivered
    }

    /// Execute a command for `conn`, whose current room is `room`.
    async fn execute(&self, conn: &Arc<Connection>, room: &RoomState, command: ChatCommand) {
        tracing::debug!(connection_id = %conn.id(), command = %command, "Executing command");

        let reply = match command {
            ChatCommand::Help => format_help(),
            ChatCommand::Rooms => self.format_rooms().await,
            ChatCommand::Users => self.format_users(room).await,
            ChatCommand::Stats => self.format_stats(room).await,
            ChatCommand::Join(target) => self.command_join(conn, &target).await,
            ChatCommand::Nick(name) => {
                if name.is_empty() {
                    "Usage: /nick <new_name>".to_string()
                } else {
                    match self.rename_locked(conn, &name).await {
                        Ok(_) => return,
                        Err(ChatError::NameTaken) => "That name is already in use".to_string(),
                        Err(e) => format!("Error: {e}"),
                    }
                }
            }
            ChatCommand::Unknown(verb) => format!("Unknown command: /{verb}"),
        };

        self.reply(conn, reply).await;
    }

    async fn command_join(&self, conn: &Arc<Connection>, target: &str) -> String {
        if target.is_empty() {
            return "Usage: /join <room>".to_string();
        }
        let Some(room) = self.find_room(target) else {
            return format!("Room '{target}' not found");
        };
        match self.join_locked(conn, &room.id).await {
            Ok(room) => format!("You joined {}", room.name),
            Err(e) => format!("Error: {e}"),
        }
    }

    async fn reply(&self, conn: &Arc<Connection>, content: String) {
        let Some(frame) = ServerEvent::system(content).to_frame() else {
            return;
        };
        if conn.deliver(&frame).is_err() {
            self.teardown_all(vec![conn.id().to_string()]).await;
        }
    }

    async fn format_rooms(&self) -> String {
        let mut lines = vec!["Available rooms:".to_string()];
        for info in self.list_rooms().await {
            lines.push(format!(
                "• {} ({}/{}) - {}",
                info.room.name, info.occupancy, info.room.max_users, info.room.description
            ));
        }
        lines.join("\n")
    }

    async fn format_users(&self, room: &RoomState) -> String {
        let names = self.member_names(room.id()).await;
        format!("Users in {}: {}", room.room.name, names.join(", "))
    }

    async fn format_stats(&self, room: &RoomState) -> String {
        let (occupancy, message_count) = {
            let inner = room.inner.lock().await;
            (inner.members.len(), inner.history.len())
        };
        format!(
            "Statistics for {}:\n• Users connected: {}/{}\n• Messages sent: {}\n• Created by: {}",
            room.room.name, occupancy, room.room.max_users, message_count, room.room.created_by
        )
    }

    /// Get a room by ID.
    pub fn room(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|r| r.room.clone())
    }

    /// Find a room by ID or display name, ignoring case.
    pub fn find_room(&self, query: &str) -> Option<Room> {
        self.room_order
            .iter()
            .filter_map(|id| self.rooms.get(id))
            .find(|r| r.room.matches(query))
            .map(|r| r.room.clone())
    }

    /// List all rooms with live occupancy, in configuration order.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut result = Vec::with_capacity(self.room_order.len());
        for id in &self.room_order {
            if let Some(room) = self.rooms.get(id) {
                result.push(RoomInfo {
                    room: room.room.clone(),
                    occupancy: room.inner.lock().await.members.len(),
                });
            }
        }
        result
    }

    /// Connection IDs present in a room, sorted.
    pub async fn members(&self, room_id: &str) -> Vec<ConnectionId> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        let mut ids: Vec<_> = room.inner.lock().await.members.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Usernames present in a room, sorted case-insensitively.
    pub async fn member_names(&self, room_id: &str) -> Vec<String> {
        match self.rooms.get(room_id) {
            Some(room) => usernames(&*room.inner.lock().await).await,
            None => Vec::new(),
        }
    }

    /// Retained history of a room, oldest first.
    pub async fn history(&self, room_id: &str) -> Vec<Message> {
        match self.rooms.get(room_id) {
            Some(room) => {
                let inner = room.inner.lock().await;
                inner.history.recent(inner.history.capacity())
            }
            None => Vec::new(),
        }
    }

    /// The user registered on a connection.
    pub async fn user(&self, connection_id: &str) -> Option<User> {
        let conn = self.connection(connection_id).await?;
        let state = conn.state.lock().await;
        state.user.clone()
    }

    /// Whether the connection is in the active set.
    pub async fn is_active(&self, connection_id: &str) -> bool {
        self.connections.read().await.contains_key(connection_id)
    }

    /// Number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of registered users.
    pub async fn user_count(&self) -> usize {
        self.names.lock().await.len()
    }

    /// Wait until every outbound queue is empty or `timeout` passes.
    ///
    /// Returns whether all queues drained. A frame already taken off a queue
    /// may still be in flight to its socket when this returns.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let queued: usize = self
                .connections
                .read()
                .await
                .values()
                .map(|conn| conn.queued())
                .sum();
            if queued == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(queued, "Outbound queues not drained before timeout");
                return false;
            }
            tokio::time::sleep(FLUSH_POLL_INTERVAL).await;
        }
    }
}

impl Default for ChatManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn current_room(state: &super::connection::SessionState) -> Option<String> {
    state.user.as_ref().and_then(|u| u.current_room.clone())
}

/// Lock the target room and, if given, the previous room in ascending ID order.
async fn lock_pair<'a>(
    target: &'a RoomState,
    previous: Option<&'a RoomState>,
) -> (MutexGuard<'a, RoomInner>, Option<MutexGuard<'a, RoomInner>>) {
    match previous {
        Some(prev) if prev.id() < target.id() => {
            let prev_guard = prev.inner.lock().await;
            let target_guard = target.inner.lock().await;
            (target_guard, Some(prev_guard))
        }
        Some(prev) => {
            let target_guard = target.inner.lock().await;
            let prev_guard = prev.inner.lock().await;
            (target_guard, Some(prev_guard))
        }
        None => (target.inner.lock().await, None),
    }
}

/// Deliver an event to a snapshot of the room's members.
///
/// Returns the IDs whose delivery failed; the caller tears them down after
/// releasing the room lock.
fn fan_out(inner: &RoomInner, event: &ServerEvent) -> Vec<ConnectionId> {
    let Some(frame) = event.to_frame() else {
        return Vec::new();
    };
    let targets: Vec<Arc<Connection>> = inner.members.values().cloned().collect();

    let mut failed = Vec::new();
    for conn in targets {
        if conn.deliver(&frame).is_err() {
            failed.push(conn.id().to_string());
        }
    }
    failed
}

/// Usernames of a room's members; the caller holds the room lock.
async fn usernames(inner: &RoomInner) -> Vec<String> {
    let mut names = Vec::with_capacity(inner.members.len());
    for conn in inner.members.values() {
        if let Some(user) = conn.state.lock().await.user.as_ref() {
            names.push(user.username.clone());
        }
    }
    names.sort_by_key(|name| name.to_lowercase());
    names
}
