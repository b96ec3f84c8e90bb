//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP and WebSocket settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `3000`, `0` picks a free port).
    pub port: u16,
    /// Outbound queue depth per connection. A full queue drops the message.
    pub send_queue: usize,
    /// Depth of the queue feeding the relay loop.
    pub event_queue: usize,
    /// Seconds between WebSocket pings.
    pub ping_interval_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Directory served for non-WebSocket requests, if it exists.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            send_queue: 256,
            event_queue: 1024,
            ping_interval_secs: 30,
            max_message_size: 16 * 1024 * 1024, // 16 MB
            static_dir: Some(PathBuf::from("public")),
        }
    }
}

impl ServerConfig {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ping interval, at least one second.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }
}
