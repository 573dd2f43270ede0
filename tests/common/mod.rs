//! Test helpers for chat integration tests.
//!
//! Provides TestClient (an in-process connection), TestServer, and helper
//! functions for E2E testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use pampa::chat::Outbound;
use pampa::config::RoomConfig;
use pampa::{ChatManager, Config, WebServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection accepted directly by a manager, with its outbound queue.
pub struct TestClient {
    pub id: String,
    rx: mpsc::Receiver<String>,
}

impl TestClient {
    /// Accept a new connection with a large outbound queue.
    pub async fn connect(manager: &ChatManager) -> Self {
        Self::connect_with_buffer(manager, 1024).await
    }

    /// Accept a new connection with the given queue capacity.
    pub async fn connect_with_buffer(manager: &ChatManager, capacity: usize) -> Self {
        let (outbound, rx) = Outbound::channel(capacity);
        let id = manager.accept(outbound).await;
        Self { id, rx }
    }

    /// Accept a connection and register it.
    pub async fn register(manager: &ChatManager, username: &str) -> Self {
        let mut client = Self::connect(manager).await;
        manager.register(&client.id, username).await.unwrap();
        client.drain();
        client
    }

    /// Take every queued event.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            events.push(serde_json::from_str(&frame).unwrap());
        }
        events
    }

    /// Take every queued event of the given type.
    pub fn drain_type(&mut self, kind: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }

    /// Close the receiving side, as if the transport died.
    pub fn disconnect(self) -> String {
        self.id
    }
}

/// Manager with the default seed rooms.
pub fn default_manager() -> Arc<ChatManager> {
    Arc::new(ChatManager::with_defaults())
}

/// Manager with custom room definitions.
pub fn manager_with_rooms(rooms: Vec<RoomConfig>) -> Arc<ChatManager> {
    let mut config = Config::default();
    config.chat.default_room = rooms[0].id.clone();
    config.rooms = rooms;
    Arc::new(ChatManager::from_config(&config))
}

/// Running web server bound to a random local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub manager: Arc<ChatManager>,
}

impl TestServer {
    /// Start a server with the default configuration.
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    /// Start a server with the given configuration on 127.0.0.1:0.
    pub async fn start_with(mut config: Config) -> Self {
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;

        let manager = Arc::new(ChatManager::from_config(&config));
        let server = WebServer::new(&config, manager.clone()).unwrap();
        let addr = server.run_with_addr().await.unwrap();
        Self { addr, manager }
    }

    /// WebSocket URL of the chat endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}
