//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may be partial; missing fields keep their default value.

use posecast_core::ReplyScope;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 8000, "replyScope": "broadcast" },
///   "pose": { "extractor": "onnx", "modelPath": "/models/movenet.onnx" },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PosecastSettings {
    /// Network and session settings.
    pub server: ServerSettings,
    /// Landmark extraction settings.
    pub pose: PoseSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl PosecastSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if server.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeatIntervalMs must be at least 1".into(),
            ));
        }
        if server.heartbeat_timeout_ms < server.heartbeat_interval_ms {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeatTimeoutMs ({}) is shorter than heartbeatIntervalMs ({})",
                server.heartbeat_timeout_ms, server.heartbeat_interval_ms
            )));
        }
        if server.max_frame_bytes > server.max_message_size {
            return Err(SettingsError::InvalidValue(format!(
                "server.maxFrameBytes ({}) exceeds maxMessageSize ({})",
                server.max_frame_bytes, server.max_message_size
            )));
        }
        let pose = &self.pose;
        if !(0.0..=1.0).contains(&pose.min_detection_confidence) {
            return Err(SettingsError::InvalidValue(format!(
                "pose.minDetectionConfidence must be within [0, 1], got {}",
                pose.min_detection_confidence
            )));
        }
        if pose.extractor == ExtractorKind::Onnx && pose.model_path.is_none() {
            return Err(SettingsError::InvalidValue(
                "pose.modelPath is required when pose.extractor is \"onnx\"".into(),
            ));
        }
        if pose.input_size == 0 {
            return Err(SettingsError::InvalidValue("pose.inputSize must be at least 1".into()));
        }
        Ok(())
    }
}

/// Network and per-session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks an ephemeral port).
    pub port: u16,
    /// Origins permitted by CORS. Empty means permissive.
    pub allowed_origins: Vec<String>,
    /// Whether replies fan out to every session or only the sender.
    pub reply_scope: ReplyScope,
    /// Capacity of each session's outbound queue.
    pub send_queue_capacity: usize,
    /// Largest WebSocket message accepted by the transport.
    pub max_message_size: usize,
    /// Largest binary frame handed to the decoder.
    pub max_frame_bytes: usize,
    /// Interval between server-initiated Ping frames.
    pub heartbeat_interval_ms: u64,
    /// Session is dropped after this long without any inbound activity
    /// across heartbeat checks.
    pub heartbeat_timeout_ms: u64,
    /// Maximum wait for the next inbound message. `0` disables.
    pub idle_timeout_ms: u64,
    /// Grace period for in-flight work on shutdown.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:5500".to_string(),
                "http://127.0.0.1:5500".to_string(),
            ],
            reply_scope: ReplyScope::Broadcast,
            send_queue_capacity: 64,
            max_message_size: 16 * 1024 * 1024,
            max_frame_bytes: 8 * 1024 * 1024,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            idle_timeout_ms: 120_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Which landmark extractor backs the relay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// No model; every decoded frame reports no pose.
    #[default]
    Disabled,
    /// ONNX single-pose keypoint model (requires the `ort` feature).
    Onnx,
}

/// Landmark extraction settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoseSettings {
    /// Extractor backend.
    pub extractor: ExtractorKind,
    /// Path to the model file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    /// Square model input resolution in pixels.
    pub input_size: u32,
    /// Mean keypoint score below which a frame reports no pose.
    pub min_detection_confidence: f32,
    /// Intra-op threads for the inference session.
    pub intra_threads: usize,
}

impl Default for PoseSettings {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::Disabled,
            model_path: None,
            input_size: 192,
            min_detection_confidence: 0.5,
            intra_threads: 2,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
