//! Settings loading with deep merge and environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GuesswhoSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use guesswho_core::logging::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::GuesswhoSettings;

/// Resolve the default settings file path (`~/.guesswho/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".guesswho").join("settings.json")
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GuesswhoSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file(path: &Path) -> Result<GuesswhoSettings> {
    let defaults = serde_json::to_value(GuesswhoSettings::default())?;

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

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut GuesswhoSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Empty values are treated as unset. Values that fail to parse or fall
/// outside their range are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut GuesswhoSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    // ── Relay ───────────────────────────────────────────────────────
    if let Some(v) = read("REDIS_ADDR") {
        settings.relay.address = Some(v.trim().to_string());
    }
    if let Some(v) = read("GUESSWHO_RELAY_CHANNEL") {
        settings.relay.channel = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("GUESSWHO_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("GUESSWHO_PORT")
        .and_then(|v| parse_in_range("GUESSWHO_PORT", &v, 0, u16::MAX))
    {
        settings.server.port = v;
    }

    // ── Broker ──────────────────────────────────────────────────────
    if let Some(v) = read("GUESSWHO_CONDUIT_CAPACITY")
        .and_then(|v| parse_in_range("GUESSWHO_CONDUIT_CAPACITY", &v, 1, 65_536))
    {
        settings.broker.conduit_capacity = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("GUESSWHO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("GUESSWHO_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(
                key = "GUESSWHO_LOG_FORMAT",
                value = %v,
                "invalid log format, ignoring"
            ),
        }
    }
}

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.trim().to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

fn parse_in_range<T>(key: &str, val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Copy,
{
    let parsed = val
        .trim()
        .parse::<T>()
        .ok()
        .filter(|n| *n >= min && *n <= max);
    if parsed.is_none() {
        tracing::warn!(key, value = %val, "invalid numeric env var, ignoring");
    }
    parsed
}
