//! Chat module for PAMPA Chat.
//!
//! This module provides the room-based chat core:
//! - Fixed rooms with capacity limits and bounded history
//! - Connection lifecycle (accept, register, teardown)
//! - Message broadcast within a room
//! - Chat commands (/help, /rooms, /users, /join, /nick, /stats)

mod command;
mod connection;
mod event;
mod history;
mod manager;
mod message;
mod room;
mod user;

pub use command::{
    format_help, lookup, parse_input, ChatCommand, ChatInput, CommandInfo, COMMANDS,
    COMMAND_PREFIX,
};
pub use connection::{Connection, ConnectionId, Outbound};
pub use event::ServerEvent;
pub use history::HistoryRing;
pub use manager::{ChatManager, ChatResult, SendOutcome};
pub use message::{Message, MessageKind};
pub use room::{Room, RoomInfo};
pub use user::{random_avatar, User, AVATAR_COLORS};
