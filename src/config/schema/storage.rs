use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where session state lives on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for mirrored session files. Empty = `<home>/.convokit/sessions`.
    /// A leading `~` is expanded.
    #[serde(default)]
    pub data_dir: String,
    /// Mirror sessions into the remote row store when an identity is configured
    #[serde(default = "default_remote_enabled")]
    pub remote_enabled: bool,
    /// Remote store database file. Empty = `<home>/.convokit/remote.db`.
    #[serde(default)]
    pub remote_db: String,
}

fn default_remote_enabled() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            remote_enabled: default_remote_enabled(),
            remote_db: String::new(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_data_dir(&self, base_dir: &Path) -> PathBuf {
        resolve_or(&self.data_dir, || base_dir.join("sessions"))
    }

    pub fn resolve_remote_db(&self, base_dir: &Path) -> PathBuf {
        resolve_or(&self.remote_db, || base_dir.join("remote.db"))
    }
}

fn resolve_or(raw: &str, fallback: impl FnOnce() -> PathBuf) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        PathBuf::from(shellexpand::tilde(trimmed).to_string())
    }
}
