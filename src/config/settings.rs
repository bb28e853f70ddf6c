use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// What a collection refresh does when one record fails to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecryptFailurePolicy {
    /// Publish an empty snapshot for the whole batch.
    #[default]
    DiscardBatch,
    /// Publish the records that decrypted and list the others as undecryptable.
    SkipRecord,
}

/// Project-level configuration, loaded from `.passvault.toml`.
///
/// Every field has a sensible default so PassVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path (relative to the project dir) of the local document store file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Identity to act as when `--identity` is not given.
    #[serde(default)]
    pub identity: Option<String>,

    /// Display name reported for that identity.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Minimum master passphrase length accepted by `setup`.
    #[serde(default = "default_min_passphrase_length")]
    pub min_passphrase_length: usize,

    /// Snapshots buffered per subscription before the producer waits.
    #[serde(default = "default_snapshot_buffer")]
    pub snapshot_buffer: usize,

    /// Behaviour when a record in a refresh batch fails to decrypt.
    #[serde(default)]
    pub decrypt_failure: DecryptFailurePolicy,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_path() -> String {
    ".passvault/store.json".to_string()
}

fn default_min_passphrase_length() -> usize {
    8
}

fn default_snapshot_buffer() -> usize {
    16
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            identity: None,
            display_name: None,
            min_passphrase_length: default_min_passphrase_length(),
            snapshot_buffer: default_snapshot_buffer(),
            decrypt_failure: DecryptFailurePolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".passvault.toml";

    /// Load settings from `<project_dir>/.passvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.snapshot_buffer == 0 {
            return Err(VaultError::ConfigError(
                "snapshot_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Full path to the store file.
    ///
    /// Example: `project_dir/.passvault/store.json`
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_path)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
