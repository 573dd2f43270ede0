//! Web server for PAMPA Chat.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::chat::ChatManager;
use crate::config::Config;
use crate::{PampaError, Result};

use super::router::create_router;
use super::ws::ChatWsState;

/// Notice posted to every room when the server stops.
pub const SHUTDOWN_NOTICE: &str = "Server is shutting down";

/// How long shutdown waits for outbound queues to drain.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Web server hosting the chat WebSocket endpoint.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Chat manager shared with every session.
    manager: Arc<ChatManager>,
    /// WebSocket handler state.
    ws_state: Arc<ChatWsState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, manager: Arc<ChatManager>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| PampaError::Config(format!("invalid server address: {e}")))?;

        let ws_state = Arc::new(ChatWsState::new(manager.clone(), config.chat.clone()));

        Ok(Self {
            addr,
            manager,
            ws_state,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the web server until Ctrl-C.
    ///
    /// On shutdown a notice is posted to every room and the outbound queues
    /// get up to `SHUTDOWN_FLUSH_TIMEOUT` to drain before the listener
    /// stops. Delivery of the notice is best-effort: sessions whose queue
    /// does not drain in time may close without it.
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.ws_state);

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        let manager = self.manager;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                    return;
                }
                tracing::info!("Shutdown signal received");
                manager.announce_all(SHUTDOWN_NOTICE).await;
                if !manager.flush(SHUTDOWN_FLUSH_TIMEOUT).await {
                    tracing::warn!("Shutdown notice may not reach every session");
                }
            })
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = create_router(self.ws_state);

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
