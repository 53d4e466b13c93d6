//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduler and frame-driver timing constants (`[timing]`)
//! - Session defaults: technique, cycle target, technique directory (`[session]`)
//!
//! Configuration is stored at `~/.config/breathroom/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError};
use crate::technique::TechniqueLibrary;
use crate::timer::TimingConfig;

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_technique")]
    pub default_technique: String,
    /// Stop after this many completed cycles. Runs until stopped when unset.
    #[serde(default)]
    pub target_cycles: Option<u32>,
    /// Extra technique files. Defaults to `<data dir>/techniques`.
    #[serde(default)]
    pub techniques_dir: Option<PathBuf>,
    #[serde(default = "default_notice_timeout_ms")]
    pub notice_timeout_ms: u64,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_technique() -> String {
    "box".to_string()
}
fn default_notice_timeout_ms() -> u64 {
    4000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_technique: default_technique(),
            target_cycles: None,
            techniques_dir: None,
            notice_timeout_ms: default_notice_timeout_ms(),
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
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

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
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                    // Optional values: "none" clears, numbers stay numbers.
                    serde_json::Value::Null => {
                        if value.is_empty() || value.eq_ignore_ascii_case("none") {
                            serde_json::Value::Null
                        } else {
                            parse_number(value)
                                .unwrap_or_else(|| serde_json::Value::String(value.into()))
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
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

    /// Load from the data directory, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.timing.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    ///
    /// Unset optional values read as `none`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("none".to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Flattened `(key, value)` pairs for every leaf setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            flatten("", &json, &mut out);
        }
        out
    }

    /// Change a value in memory, keeping the configuration valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result breaks the timing constraints.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.timing.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Directory scanned for technique files.
    pub fn techniques_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.session.techniques_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("techniques")),
        }
    }

    /// Built-in techniques plus any found in the techniques directory.
    pub fn technique_library(&self) -> Result<TechniqueLibrary, CoreError> {
        let mut library = TechniqueLibrary::builtin();
        let dir = self.techniques_dir()?;
        if dir.is_dir() {
            library.load_dir(&dir)?;
        }
        Ok(library)
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        return Some(serde_json::Value::Number(n.into()));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        serde_json::Value::Null => out.push((prefix.to_string(), "none".to_string())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
