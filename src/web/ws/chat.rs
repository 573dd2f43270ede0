//! Chat WebSocket handler.
//!
//! Each socket is split in two: a writer task drains the connection's
//! outbound queue and sends heartbeat pings, while the reader loop decodes
//! client frames and calls into the [`ChatManager`].

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::chat::{ChatManager, Outbound, ServerEvent};
use crate::config::ChatConfig;

use super::messages::ClientMessage;

/// State for WebSocket chat handler.
#[derive(Clone)]
pub struct ChatWsState {
    /// Chat manager.
    pub manager: Arc<ChatManager>,
    /// Chat settings.
    pub config: ChatConfig,
}

impl ChatWsState {
    /// Create a new chat WebSocket state.
    pub fn new(manager: Arc<ChatManager>, config: ChatConfig) -> Self {
        Self { manager, config }
    }
}

/// WebSocket chat handler.
///
/// GET /ws
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ChatWsState>>,
) -> Response {
    ws.max_message_size(state.config.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<ChatWsState>) {
    let (outbound, outbound_rx) = Outbound::channel(state.config.outbound_buffer);
    let connection_id = state.manager.accept(outbound).await;

    let (ws_sender, mut ws_receiver) = socket.split();
    let heartbeat = Duration::from_secs(state.config.heartbeat_interval_secs);
    let mut writer = tokio::spawn(write_loop(ws_sender, outbound_rx, heartbeat));

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&state, &connection_id, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(connection_id = %connection_id, "WebSocket closed by client");
                    break;
                }
                // Pings are answered by the transport.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!(connection_id = %connection_id, "WebSocket writer stopped");
                break;
            }
        }
    }

    state.manager.teardown(&connection_id).await;
    writer.abort();
    tracing::debug!(connection_id = %connection_id, "WebSocket session ended");
}

/// Forward queued frames to the socket and keep the connection alive.
async fn write_loop(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    heartbeat: Duration,
) {
    let mut ping = tokio::time::interval(heartbeat);
    // Skip the first immediate tick
    ping.tick().await;

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Handle one text frame from the client.
async fn handle_text(state: &ChatWsState, connection_id: &str, text: &str) {
    let manager = &state.manager;

    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Failed to parse client message");
            manager
                .send_to(connection_id, &ServerEvent::error("Invalid message format"))
                .await;
            return;
        }
    };

    match msg {
        ClientMessage::Register { username } => {
            let username = username.trim();
            if username.is_empty() {
                manager
                    .send_to(connection_id, &ServerEvent::error("Username required"))
                    .await;
                return;
            }
            let result = manager.register(connection_id, username).await;
            manager
                .send_to(connection_id, &ServerEvent::registration(result))
                .await;
        }
        ClientMessage::Message { content } => {
            let content = content.trim();
            if content.is_empty() {
                return;
            }
            let max = state.config.max_message_length;
            if content.chars().count() > max {
                let error = ServerEvent::error(format!("Message too long (max {max} characters)"));
                manager.send_to(connection_id, &error).await;
                return;
            }
            if let Err(e) = manager.send_message(connection_id, content).await {
                manager
                    .send_to(connection_id, &ServerEvent::error(e.to_string()))
                    .await;
            }
        }
        ClientMessage::JoinRoom { room_id } => {
            let room_id = room_id.trim();
            if room_id.is_empty() {
                return;
            }
            let result = manager.join_room(connection_id, room_id).await;
            manager
                .send_to(connection_id, &ServerEvent::join(result))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ChatWsState {
        ChatWsState::new(Arc::new(ChatManager::with_defaults()), ChatConfig::default())
    }

    fn next_event(rx: &mut mpsc::Receiver<String>) -> serde_json::Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_frame_reports_format_error() {
        let state = state();
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;

        handle_text(&state, &id, "{not json").await;
        let event = next_event(&mut rx);
        assert_eq!(event["type"], "error");
        assert_eq!(event["message"], "Invalid message format");
    }

    #[tokio::test]
    async fn test_register_empty_username() {
        let state = state();
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;

        handle_text(&state, &id, r#"{"type":"register","username":"  "}"#).await;
        assert_eq!(next_event(&mut rx)["message"], "Username required");
        assert!(state.manager.user(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_register_sends_result_after_room_events() {
        let state = state();
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;

        handle_text(&state, &id, r#"{"type":"register","username":"alice"}"#).await;
        assert_eq!(next_event(&mut rx)["type"], "user_joined");
        assert_eq!(next_event(&mut rx)["type"], "message_history");
        let result = next_event(&mut rx);
        assert_eq!(result["type"], "registration_result");
        assert_eq!(result["success"], true);
        assert_eq!(result["user"]["current_room"], "general");
    }

    #[tokio::test]
    async fn test_empty_message_is_ignored() {
        let state = state();
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;

        handle_text(&state, &id, r#"{"type":"message","content":"   "}"#).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_message_before_register_reports_error() {
        let state = state();
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;

        handle_text(&state, &id, r#"{"type":"message","content":"hi"}"#).await;
        assert_eq!(next_event(&mut rx)["message"], "user not registered");
    }

    #[tokio::test]
    async fn test_message_too_long() {
        let mut state = state();
        state.config.max_message_length = 5;
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;

        handle_text(&state, &id, r#"{"type":"message","content":"toolong"}"#).await;
        let event = next_event(&mut rx);
        assert_eq!(event["type"], "error");
        assert!(event["message"].as_str().unwrap().contains("too long"));
    }

    #[tokio::test]
    async fn test_join_room_reports_result() {
        let state = state();
        let (outbound, mut rx) = Outbound::channel(16);
        let id = state.manager.accept(outbound).await;
        state.manager.register(&id, "alice").await.unwrap();
        while rx.try_recv().is_ok() {}

        handle_text(&state, &id, r#"{"type":"join_room","room_id":"atlantis"}"#).await;
        let event = next_event(&mut rx);
        assert_eq!(event["type"], "join_result");
        assert_eq!(event["success"], false);
        assert_eq!(event["error"], "room not found");
    }
}
