//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ScoutSettings;

/// `~/.scout/settings.json`
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".scout").join("settings.json")
}

pub fn load_settings() -> Result<ScoutSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// [`ScoutSettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ScoutSettings> {
    let merged = merge_file(path)?;
    let mut settings: ScoutSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

fn merge_file(path: &Path) -> Result<Value> {
    let defaults = serde_json::to_value(ScoutSettings::default())?;
    if !path.exists() {
        debug!(?path, "settings file not found, using defaults");
        return Ok(defaults);
    }
    debug!(?path, "loading settings from file");
    let content = std::fs::read_to_string(path)?;
    let user: Value = serde_json::from_str(&content)?;
    Ok(deep_merge(defaults, user))
}

pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SCOUT_*` overrides. `lookup` reads one variable; tests pass a map.
///
/// Invalid values are logged and ignored (file/default value stays).
pub fn apply_env_overrides<F>(settings: &mut ScoutSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("SCOUT_BASE_URL") {
        settings.model.base_url = v;
    }
    if let Some(v) = env.string("SCOUT_MODEL") {
        settings.model.model = v;
    }
    if let Some(v) = env.string("SCOUT_COMPRESSION_MODEL") {
        settings.model.compression_model = v;
    }
    if let Some(v) = env.u64("SCOUT_MAX_TURNS", 1, 100) {
        settings.retrieval.max_turns = v as u32;
    }
    if let Some(v) = env.u64("SCOUT_MAX_DURATION_SECS", 1, 86_400) {
        settings.retrieval.max_duration_secs = v;
    }
    if let Some(v) = env.u64("SCOUT_OPERATION_TIMEOUT_SECS", 1, 3_600) {
        settings.retrieval.operation_timeout_secs = v;
    }
    if let Some(v) = env.u64("SCOUT_MAX_RETRIES", 0, 10) {
        settings.retry.max_retries = v as u32;
    }
    if let Some(v) = env.string("SCOUT_CATALOG_PATH") {
        settings.catalog.path = Some(v);
    }
    if let Some(v) = env.string("SCOUT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("SCOUT_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
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

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, min, max, "invalid integer env var, ignoring");
        }
        result
    }
}
