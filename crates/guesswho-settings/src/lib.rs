//! # guesswho-settings
//!
//! Configuration with layered sources, in priority order:
//! 1. **Compiled defaults**: [`GuesswhoSettings::default()`]
//! 2. **Settings file**: `~/.guesswho/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `REDIS_ADDR` and `GUESSWHO_*` (highest priority)
//!
//! Settings are loaded once in the binary and passed down explicitly.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings_from_path, settings_path,
};
pub use types::*;
