//! # arc-settings
//!
//! Configuration for the bridge and log saver binaries, loaded in three
//! layers (lowest to highest priority):
//! 1. **Compiled defaults**: [`ArcSettings::default()`]
//! 2. **Settings file**: `$ARC_SETTINGS` or `~/.arc/settings.json`
//! 3. **Environment variables**: `ARC_*` overrides
//!
//! Command-line flags on the binaries are applied on top of the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, load_settings, load_settings_with, merge_json, settings_path};
pub use types::{ArcSettings, BridgeSettings, LogFormat, LogSaverSettings, LoggingSettings};
