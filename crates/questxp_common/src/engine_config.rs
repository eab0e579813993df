//! Engine Configuration
//!
//! Config file: ~/.config/questxp/config.toml or /etc/questxp/config.toml

use crate::error::EngineError;
use crate::pool::MidDayLevelPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Advisory text shown when the pool is empty
pub const DEFAULT_LIMIT_MESSAGE: &str = "Daily XP limit reached";

/// Daily pool behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// What a level-up during the day does to that day's cap
    #[serde(default)]
    pub mid_day_level_policy: MidDayLevelPolicy,

    /// Message attached to zero awards and previews on an empty pool
    #[serde(default = "default_limit_message")]
    pub limit_message: String,
}

fn default_limit_message() -> String {
    DEFAULT_LIMIT_MESSAGE.to_string()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mid_day_level_policy: MidDayLevelPolicy::default(),
            limit_message: default_limit_message(),
        }
    }
}

/// User defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsersConfig {
    /// Offset used when a user's stored offset is out of range
    #[serde(default)]
    pub default_utc_offset_minutes: i32,
}

/// Award audit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSONL award log; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_log: Option<PathBuf>,

    /// Frozen pools older than this many days may be pruned
    #[serde(default = "default_retain_days")]
    pub retain_days: u32,
}

fn default_retain_days() -> u32 {
    30
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            award_log: None,
            retain_days: default_retain_days(),
        }
    }
}

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub users: UsersConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

impl EngineConfig {
    /// Get default user config path: ~/.config/questxp/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg).join("questxp").join("config.toml"));
        }
        let home = std::env::var("HOME").context("Cannot determine home directory")?;
        Ok(Path::new(&home)
            .join(".config")
            .join("questxp")
            .join("config.toml"))
    }

    /// Get system config path: /etc/questxp/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/questxp/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/questxp/config.toml)
    /// 3. System config (/etc/questxp/config.toml)
    /// 4. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Check values that serde alone cannot rule out
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pool.limit_message.trim().is_empty() {
            return Err(EngineError::Config("pool.limit_message cannot be empty".into()));
        }
        let offset = self.users.default_utc_offset_minutes;
        if offset.abs() >= 24 * 60 {
            return Err(EngineError::Config(format!(
                "users.default_utc_offset_minutes out of range: {}",
                offset
            )));
        }
        Ok(())
    }

    /// Set a value by dotted key, e.g. `pool.mid_day_level_policy=raise_on_level_up`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "pool.mid_day_level_policy" => {
                self.pool.mid_day_level_policy = MidDayLevelPolicy::parse(value).with_context(|| {
                    format!(
                        "Invalid policy: '{}'. Valid values: freeze_at_start_of_day, raise_on_level_up",
                        value
                    )
                })?;
            }
            "pool.limit_message" => {
                if value.trim().is_empty() {
                    anyhow::bail!("limit_message cannot be empty");
                }
                self.pool.limit_message = value.to_string();
            }
            "users.default_utc_offset_minutes" => {
                let minutes: i32 = value
                    .parse()
                    .with_context(|| format!("Invalid offset: '{}'", value))?;
                if minutes.abs() >= 24 * 60 {
                    anyhow::bail!("Offset must be within +/- 1439 minutes, got {}", minutes);
                }
                self.users.default_utc_offset_minutes = minutes;
            }
            "audit.award_log" => {
                self.audit.award_log = match value.trim() {
                    "" | "none" | "off" => None,
                    path => Some(PathBuf::from(path)),
                };
            }
            "audit.retain_days" => {
                self.audit.retain_days = value
                    .parse()
                    .with_context(|| format!("Invalid day count: '{}'", value))?;
            }
            _ => anyhow::bail!("Unknown configuration key: '{}'", key),
        }
        Ok(())
    }
}
