//! Configuration file support for the tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/tracker/config.toml`.

use crate::{Error, Result, DEFAULT_WEIGHT_INCREMENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub habits: HabitsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Progression parameters configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Increment for exercises without a stored preference
    #[serde(default = "default_weight_increment")]
    pub default_weight_increment: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            default_weight_increment: default_weight_increment(),
        }
    }
}

/// Habit policy configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HabitsConfig {
    /// Reject completions once a bounded habit reached its daily target
    #[serde(default = "default_enforce_daily_limit")]
    pub enforce_daily_limit: bool,
}

impl Default for HabitsConfig {
    fn default() -> Self {
        Self {
            enforce_daily_limit: default_enforce_daily_limit(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("tracker")
}

fn default_weight_increment() -> f64 {
    DEFAULT_WEIGHT_INCREMENT
}

fn default_enforce_daily_limit() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<()> {
        let increment = self.progression.default_weight_increment;
        if !increment.is_finite() || increment <= 0.0 {
            return Err(Error::Config(format!(
                "default_weight_increment must be positive, got {}",
                increment
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("tracker").join("config.toml")
    }
}
