//! Web module for PAMPA Chat.
//!
//! Serves the chat WebSocket endpoint at `/ws` and a health check at
//! `/health`.

pub mod router;
pub mod server;
pub mod ws;

pub use router::create_router;
pub use server::{WebServer, SHUTDOWN_NOTICE};
