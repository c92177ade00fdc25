//! # posecast-settings
//!
//! Configuration for the posecast relay, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`PosecastSettings::default()`]
//! 2. **Settings file**: `~/.posecast/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `POSECAST_*` overrides (highest priority)
//!
//! The relay binary applies its CLI flags on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
