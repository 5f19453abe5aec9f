use super::super::{MemoryConfig, StorageConfig};
use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory (`~/.convokit`) - computed from home, not serialized
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub default_temperature: f64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_log_level() -> String {
    "info".into()
}

/// The signed-in user, if any. Remote persistence is skipped without one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::new(),
            config_path: PathBuf::new(),
            api_key: None,
            default_provider: Some("groq".to_string()),
            default_model: Some("llama-3.3-70b-versatile".to_string()),
            default_temperature: 0.7,
            log_level: default_log_level(),
            memory: MemoryConfig::default(),
            storage: StorageConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::Validation(format!(
                "default_temperature must be within 0.0..=2.0, got {}",
                self.default_temperature
            ))
            .into());
        }
        self.memory
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(())
    }

    /// User id to scope remote writes by, when remote persistence is on.
    pub fn remote_identity(&self) -> Option<&str> {
        if !self.storage.remote_enabled {
            return None;
        }
        self.identity
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage.resolve_data_dir(&self.base_dir)
    }

    pub fn remote_db_path(&self) -> PathBuf {
        self.storage.resolve_remote_db(&self.base_dir)
    }
}
