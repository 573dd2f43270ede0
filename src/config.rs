//! Configuration module for PAMPA Chat.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::{PampaError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chat behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Room every user joins right after registering.
    #[serde(default = "default_room")]
    pub default_room: String,
    /// Messages retained per room.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Messages replayed to a user joining a room.
    #[serde(default = "default_history_replay")]
    pub history_replay: usize,
    /// Outbound frames queued per connection before it is dropped.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Maximum chat message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Maximum inbound WebSocket frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Interval between WebSocket pings.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_room() -> String {
    "general".to_string()
}

fn default_history_capacity() -> usize {
    100
}

fn default_history_replay() -> usize {
    50
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_message_length() -> usize {
    1000
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

/// Room left in a frame for the JSON envelope around the message text.
const FRAME_ENVELOPE_BYTES: usize = 1024;

fn default_heartbeat_interval() -> u64 {
    54
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_room: default_room(),
            history_capacity: default_history_capacity(),
            history_replay: default_history_replay(),
            outbound_buffer: default_outbound_buffer(),
            max_message_length: default_max_message_length(),
            max_frame_bytes: default_max_frame_bytes(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty logs to stdout only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/pampa.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// A room created at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoomConfig {
    /// Room ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Maximum number of occupants.
    pub max_users: usize,
    /// Whether the room is listed publicly.
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    /// Creator name.
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_is_public() -> bool {
    true
}

fn default_created_by() -> String {
    "system".to_string()
}

impl RoomConfig {
    /// Public room created by the system.
    pub fn seed(id: &str, name: &str, description: &str, max_users: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            max_users,
            is_public: true,
            created_by: default_created_by(),
        }
    }
}

fn default_rooms() -> Vec<RoomConfig> {
    vec![
        RoomConfig::seed(
            "general",
            "General",
            "Main room for general conversation",
            50,
        ),
        RoomConfig::seed(
            "tecnologia",
            "Tecnología",
            "Technology and programming discussions",
            30,
        ),
        RoomConfig::seed("python", "Python", "All about Python and its frameworks", 25),
    ]
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Rooms created at startup.
    #[serde(default = "default_rooms")]
    pub rooms: Vec<RoomConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
            rooms: default_rooms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PampaError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PampaError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PAMPA_HOST`: Override the bind host
    /// - `PAMPA_PORT`: Override the bind port (ignored if not a valid port)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PAMPA_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("PAMPA_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chat.history_capacity == 0 {
            return Err(PampaError::Validation(
                "chat.history_capacity must be greater than 0".to_string(),
            ));
        }
        if self.chat.history_replay > self.chat.history_capacity {
            return Err(PampaError::Validation(
                "chat.history_replay cannot exceed chat.history_capacity".to_string(),
            ));
        }
        if self.chat.outbound_buffer == 0 {
            return Err(PampaError::Validation(
                "chat.outbound_buffer must be greater than 0".to_string(),
            ));
        }
        // A UTF-8 character takes up to 4 bytes on the wire.
        let min_frame = self.chat.max_message_length * 4 + FRAME_ENVELOPE_BYTES;
        if self.chat.max_frame_bytes < min_frame {
            return Err(PampaError::Validation(format!(
                "chat.max_frame_bytes must be at least {min_frame} for max_message_length {}",
                self.chat.max_message_length
            )));
        }
        if self.chat.heartbeat_interval_secs == 0 {
            return Err(PampaError::Validation(
                "chat.heartbeat_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.rooms.is_empty() {
            return Err(PampaError::Validation(
                "at least one room must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for room in &self.rooms {
            if !seen.insert(room.id.as_str()) {
                return Err(PampaError::Validation(format!(
                    "duplicate room id: {}",
                    room.id
                )));
            }
            if room.max_users == 0 {
                return Err(PampaError::Validation(format!(
                    "room {} must allow at least one user",
                    room.id
                )));
            }
        }

        if !seen.contains(self.chat.default_room.as_str()) {
            return Err(PampaError::Validation(format!(
                "default room {} is not configured",
                self.chat.default_room
            )));
        }
        Ok(())
    }
}
