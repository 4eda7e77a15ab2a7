//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Activation engine timing (tick interval, firing margin)
//! - Position sensor options and the retry policy for one-shot reads
//! - Notification preferences
//! - Defaults for new reminders
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::activation::EngineConfig;
use crate::error::ConfigError;
use crate::position::{PositionOptions, RetryPolicy};
use crate::reminder::DEFAULT_CATEGORY;

/// Activation engine timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_firing_margin_secs")]
    pub firing_margin_secs: u64,
    /// Widen the firing margin to five minutes for coarse background timers.
    #[serde(default)]
    pub coarse_background: bool,
    #[serde(default)]
    pub clear_notified_on_stop: bool,
}

/// Position sensor options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSection {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub maximum_age_ms: u64,
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ring the terminal bell when a reminder fires.
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// Defaults applied when adding reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_radius_m")]
    pub default_radius_m: f64,
    #[serde(default = "default_category")]
    pub default_category: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub position: PositionSection,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
}

// Default functions
fn default_tick_interval_secs() -> u64 {
    30
}
fn default_firing_margin_secs() -> u64 {
    60
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_initial_delay_ms() -> u64 {
    5_000
}
fn default_retry_max_delay_ms() -> u64 {
    30_000
}
fn default_true() -> bool {
    true
}
fn default_radius_m() -> f64 {
    100.0
}
fn default_category() -> String {
    DEFAULT_CATEGORY.into()
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            firing_margin_secs: default_firing_margin_secs(),
            coarse_background: false,
            clear_notified_on_stop: false,
        }
    }
}

impl Default for PositionSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            maximum_age_ms: 0,
            high_accuracy: true,
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
            default_category: default_category(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err("config key is empty".into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| format!("unknown config key: {key}"))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| format!("unknown config key: {key}"))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse::<bool>()?),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| format!("cannot parse '{value}' as number"))?
                        } else {
                            return Err(format!("cannot parse '{value}' as number").into());
                        }
                    }
                    serde_json::Value::Object(_) => {
                        return Err(format!("'{key}' is a section, set one of its keys").into());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
        }

        Err(format!("unknown config key: {key}").into())
    }

    fn collect_keys(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
        match value {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    Self::collect_keys(&key, v, out);
                }
            }
            serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    /// Path of the config file inside the data directory.
    pub fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            Self::collect_keys("", &json, &mut out);
        }
        out.sort();
        out
    }

    /// Set a value by key in memory. Returns error if the key is unknown or
    /// the result is invalid; `self` is left unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        };
        if self.engine.tick_interval_secs == 0 {
            return Err(invalid("engine.tick_interval_secs", "must be at least 1"));
        }
        if self.engine.firing_margin_secs == 0 {
            return Err(invalid("engine.firing_margin_secs", "must be at least 1"));
        }
        if self.position.retry_attempts == 0 {
            return Err(invalid("position.retry_attempts", "must be at least 1"));
        }
        let radius = self.reminders.default_radius_m;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(invalid("reminders.default_radius_m", "must be a positive number"));
        }
        if self.reminders.default_category.trim().is_empty() {
            return Err(invalid("reminders.default_category", "must not be empty"));
        }
        Ok(())
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            timeout: Duration::from_millis(self.position.timeout_ms),
            maximum_age: Duration::from_millis(self.position.maximum_age_ms),
            high_accuracy: self.position.high_accuracy,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.position.retry_attempts,
            initial_delay: Duration::from_millis(self.position.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.position.retry_max_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let base = if self.engine.coarse_background {
            EngineConfig::coarse_background()
        } else {
            EngineConfig {
                firing_margin: Duration::from_secs(self.engine.firing_margin_secs),
                ..EngineConfig::default()
            }
        };
        EngineConfig {
            tick_interval: Duration::from_secs(self.engine.tick_interval_secs),
            clear_notified_on_stop: self.engine.clear_notified_on_stop,
            position: self.position_options(),
            ..base
        }
    }
}
