//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default focus duration and the preset picker values
//! - Biometric sampling preferences
//! - The storage key of the session history
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use super::session_store::DEFAULT_HISTORY_KEY;
use crate::error::ConfigError;

/// Countdown preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    /// Upper bound of the duration picker.
    #[serde(default = "default_max_focus_minutes")]
    pub max_focus_minutes: u32,
    #[serde(default = "default_presets")]
    pub presets_minutes: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiometricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Give up on a sample query after this many seconds. Unset waits forever.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_history_key")]
    pub history_key: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub biometrics: BiometricsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_max_focus_minutes() -> u32 {
    60
}
fn default_presets() -> Vec<u32> {
    vec![1, 5, 15, 25]
}
fn default_true() -> bool {
    true
}
fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            max_focus_minutes: default_max_focus_minutes(),
            presets_minutes: default_presets(),
        }
    }
}

impl Default for BiometricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_secs: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_key: default_history_key(),
        }
    }
}

impl TimerConfig {
    /// Validate a requested focus length in minutes and convert to seconds.
    pub fn focus_seconds(&self, minutes: u32) -> Result<u64, ConfigError> {
        if minutes == 0 || minutes > self.max_focus_minutes {
            return Err(ConfigError::InvalidValue {
                key: "timer.focus_minutes".into(),
                message: format!(
                    "focus length must be between 1 and {} minutes, got {minutes}",
                    self.max_focus_minutes
                ),
            });
        }
        Ok(u64::from(minutes) * 60)
    }

    /// Minutes of the `number`th preset (1-based), validated like any other
    /// focus length.
    pub fn preset_seconds(&self, number: usize) -> Result<u64, ConfigError> {
        let minutes = number
            .checked_sub(1)
            .and_then(|i| self.presets_minutes.get(i))
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "timer.presets_minutes".into(),
                message: format!(
                    "no preset #{number}; {} presets are configured",
                    self.presets_minutes.len()
                ),
            })?;
        self.focus_seconds(*minutes)
    }
}

impl BiometricsConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
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
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let unknown = || ConfigError::UnknownKey(key.to_string());

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Optional values are unset in the default config.
                    serde_json::Value::Null => {
                        if value.is_empty() || value == "none" {
                            serde_json::Value::Null
                        } else {
                            let n = value.parse::<u64>().map_err(|_| {
                                invalid(format!("cannot parse '{value}' as number"))
                            })?;
                            serde_json::Value::Number(n.into())
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults out if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
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

    /// Set a config value by key and persist. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
