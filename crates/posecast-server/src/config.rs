//! Runtime server configuration.

use std::time::Duration;

use posecast_core::ReplyScope;
use posecast_settings::ServerSettings;

/// Resolved configuration for [`PosecastServer`](crate::PosecastServer).
///
/// Durations are typed here; the millisecond integers live in settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Who receives replies.
    pub reply_scope: ReplyScope,
    /// Outbound queue depth per session.
    pub send_queue_capacity: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Binary frames larger than this are dropped.
    pub max_frame_bytes: usize,
    /// Interval between server Ping frames and liveness checks.
    pub heartbeat_interval: Duration,
    /// Silence after which a session is considered dead.
    pub heartbeat_timeout: Duration,
    /// Max wait for the next inbound frame. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Budget for draining tasks on shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            allowed_origins: Vec::new(),
            reply_scope: ReplyScope::Broadcast,
            send_queue_capacity: 64,
            max_message_size: 16 * 1024 * 1024,
            max_frame_bytes: 8 * 1024 * 1024,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            idle_timeout: Some(Duration::from_secs(120)),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Build from validated settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            allowed_origins: settings.allowed_origins.clone(),
            reply_scope: settings.reply_scope,
            send_queue_capacity: settings.send_queue_capacity.max(1),
            max_message_size: settings.max_message_size,
            max_frame_bytes: settings.max_frame_bytes,
            heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms.max(1)),
            heartbeat_timeout: Duration::from_millis(settings.heartbeat_timeout_ms),
            idle_timeout: match settings.idle_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            shutdown_timeout: Duration::from_millis(settings.shutdown_timeout_ms),
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
