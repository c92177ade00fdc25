//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PosecastSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `POSECAST_*` environment overrides
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use posecast_core::ReplyScope;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{ExtractorKind, LogFormat, PosecastSettings};

/// Resolve the default settings file path (`~/.posecast/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".posecast").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PosecastSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PosecastSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<PosecastSettings> {
    let defaults = serde_json::to_value(PosecastSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `POSECAST_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut PosecastSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup` (env var name → raw value).
///
/// Invalid values are logged and ignored, falling back to file/default.
pub fn apply_overrides_from<F>(settings: &mut PosecastSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("POSECAST_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.ranged("POSECAST_PORT", 0u16, u16::MAX) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("POSECAST_ALLOWED_ORIGINS") {
        settings.server.allowed_origins = parse_list(&v);
    }
    if let Some(v) = env.enumeration::<ReplyScope>("POSECAST_REPLY_SCOPE") {
        settings.server.reply_scope = v;
    }
    if let Some(v) = env.ranged("POSECAST_IDLE_TIMEOUT_MS", 0u64, 86_400_000) {
        settings.server.idle_timeout_ms = v;
    }
    if let Some(v) = env.ranged("POSECAST_HEARTBEAT_INTERVAL_MS", 100u64, 600_000) {
        settings.server.heartbeat_interval_ms = v;
    }
    if let Some(v) = env.ranged("POSECAST_MAX_FRAME_BYTES", 1usize, 1_073_741_824) {
        settings.server.max_frame_bytes = v;
    }

    // ── Pose ────────────────────────────────────────────────────────
    if let Some(v) = env.enumeration::<ExtractorKind>("POSECAST_EXTRACTOR") {
        settings.pose.extractor = v;
    }
    if let Some(v) = env.string("POSECAST_MODEL_PATH") {
        settings.pose.model_path = Some(v);
    }
    if let Some(v) = env.ranged("POSECAST_MIN_DETECTION_CONFIDENCE", 0.0f32, 1.0) {
        settings.pose.min_detection_confidence = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("POSECAST_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.enumeration::<LogFormat>("POSECAST_LOG_FORMAT") {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a value within an inclusive range.
pub fn parse_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a lowercase serde enum name such as `"sender"` or `"json"`.
pub fn parse_enum<T: DeserializeOwned>(val: &str) -> Option<T> {
    serde_json::from_value(Value::String(val.trim().to_lowercase())).ok()
}

/// Split a comma-separated list, dropping blank entries.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn ranged<T>(&self, name: &str, min: T, max: T) -> Option<T>
    where
        T: std::str::FromStr + PartialOrd,
    {
        let val = self.string(name)?;
        let result = parse_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    }

    fn enumeration<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let val = self.string(name)?;
        let result = parse_enum(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "unrecognised env var value, ignoring");
        }
        result
    }
}
