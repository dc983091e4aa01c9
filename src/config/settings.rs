use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Pbkdf2Params, DEFAULT_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS};
use crate::errors::{Result, VaultError};
use crate::vault::manager::DEFAULT_COLLECTION;

/// Vault configuration, loaded from `.legacyvault.toml`.
///
/// Every field has a sensible default so the vault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Record store collection holding vault documents.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Minimum master password length, in characters (default: 8).
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// PBKDF2 iteration count for newly created vaults (default: 100 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_min_password_length() -> usize {
    8
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            min_password_length: default_min_password_length(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the application directory.
    const FILE_NAME: &'static str = ".legacyvault.toml";

    /// Load settings from `<dir>/.legacyvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.collection.is_empty() {
            return Err(VaultError::ConfigError(
                "collection must not be empty".into(),
            ));
        }

        if !settings.pbkdf2_params().is_in_range() {
            return Err(VaultError::ConfigError(format!(
                "pbkdf2_iterations must be within {MIN_ITERATIONS}..={MAX_ITERATIONS}"
            )));
        }

        Ok(settings)
    }

    /// Convert the KDF settings into crypto-layer params.
    pub fn pbkdf2_params(&self) -> Pbkdf2Params {
        Pbkdf2Params {
            iterations: self.pbkdf2_iterations,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
