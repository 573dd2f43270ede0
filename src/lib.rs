//! PAMPA Chat - real-time room-based chat server.
//!
//! Clients connect over WebSocket, claim a username, and exchange messages
//! inside a fixed set of rooms.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

pub use chat::{ChatManager, Message, Room, ServerEvent, User};
pub use config::Config;
pub use error::{ChatError, PampaError, Result};
pub use web::WebServer;
