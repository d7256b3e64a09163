//! TOML-based engine configuration.
//!
//! Stores the trigger thresholds and timings:
//! - Welcome popup time window, page-view threshold and random delay range
//! - Urgency bar time threshold and countdown length
//! - Exit-intent debounce and touch delay
//! - Page context stamped on analytics records
//!
//! Configuration is stored at `~/.config/popcue/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::events::PageContext;
use crate::timer::DEFAULT_COUNTDOWN_SECS;

/// Welcome popup thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeConfig {
    #[serde(default = "default_welcome_min")]
    pub min_time_secs: u32,
    #[serde(default = "default_welcome_max")]
    pub max_time_secs: u32,
    #[serde(default = "default_min_page_views")]
    pub min_page_views: u32,
    /// Lower bound of the random one-shot delay (inclusive).
    #[serde(default = "default_welcome_min")]
    pub delay_min_secs: u32,
    /// Upper bound of the random one-shot delay (exclusive).
    #[serde(default = "default_welcome_max")]
    pub delay_max_secs: u32,
}

/// Urgency bar thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyConfig {
    #[serde(default = "default_urgency_min")]
    pub min_time_secs: u32,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
}

/// Exit-intent timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitConfig {
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,
    #[serde(default = "default_touch_delay_ms")]
    pub touch_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefix of every session-store key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/popcue/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seed for the welcome delay sampler. Random per engine when unset.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub welcome: WelcomeConfig,
    #[serde(default)]
    pub urgency: UrgencyConfig,
    #[serde(default)]
    pub exit: ExitConfig,
    #[serde(default)]
    pub page: PageContext,
    #[serde(default)]
    pub storage: StorageConfig,
}

// Default functions
fn default_welcome_min() -> u32 {
    15
}
fn default_welcome_max() -> u32 {
    30
}
fn default_min_page_views() -> u32 {
    2
}
fn default_urgency_min() -> u32 {
    45
}
fn default_countdown_secs() -> u32 {
    DEFAULT_COUNTDOWN_SECS
}
fn default_scroll_debounce_ms() -> u64 {
    500
}
fn default_touch_delay_ms() -> u64 {
    100
}
fn default_key_prefix() -> String {
    "popcue".into()
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        Self {
            min_time_secs: default_welcome_min(),
            max_time_secs: default_welcome_max(),
            min_page_views: default_min_page_views(),
            delay_min_secs: default_welcome_min(),
            delay_max_secs: default_welcome_max(),
        }
    }
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            min_time_secs: default_urgency_min(),
            countdown_secs: default_countdown_secs(),
        }
    }
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            scroll_debounce_ms: default_scroll_debounce_ms(),
            touch_delay_ms: default_touch_delay_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rng_seed: None,
            welcome: WelcomeConfig::default(),
            urgency: UrgencyConfig::default(),
            exit: ExitConfig::default(),
            page: PageContext::default(),
            storage: StorageConfig::default(),
        }
    }
}

const CONFIG_HEADER: &str = indoc::indoc! {"
    # popcue configuration
    #
    # welcome.*   time window [min_time_secs, max_time_secs], page-view threshold,
    #             random delay range [delay_min_secs, delay_max_secs)
    # urgency.*   time threshold and countdown length
    # exit.*      scroll debounce and touch delay in milliseconds

"};

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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?
                            .into(),
                    ),
                    // Optional numbers (rng_seed) accept "none" to clear.
                    serde_json::Value::Null => {
                        if value.eq_ignore_ascii_case("none") {
                            serde_json::Value::Null
                        } else {
                            serde_json::Value::Number(
                                value
                                    .parse::<u64>()
                                    .map_err(|_| {
                                        invalid(format!("cannot parse '{value}' as integer"))
                                    })?
                                    .into(),
                            )
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot assign a whole section".into()));
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location, `~/.config/popcue/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/popcue"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults there if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
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
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let body = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, format!("{CONFIG_HEADER}{body}"))
            .map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("none".into()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The change is validated but not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting configuration is inconsistent.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject threshold combinations the engine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.welcome.min_time_secs > self.welcome.max_time_secs {
            return Err(ConfigError::InvalidValue {
                key: "welcome.min_time_secs".into(),
                message: "must not exceed welcome.max_time_secs".into(),
            });
        }
        if self.welcome.delay_min_secs > self.welcome.delay_max_secs {
            return Err(ConfigError::InvalidValue {
                key: "welcome.delay_min_secs".into(),
                message: "must not exceed welcome.delay_max_secs".into(),
            });
        }
        if self.urgency.countdown_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "urgency.countdown_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.storage.key_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "storage.key_prefix".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
