use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;
use crate::errors::{Result, SecretsError};

/// Project-level configuration, loaded from `.bpsecrets.toml`.
///
/// Every field has a sensible default so the tool works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault database file (relative paths are resolved against the project root).
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// scrypt cost as a power of two (default: 14, N = 16384).
    #[serde(default = "default_scrypt_log_n")]
    pub scrypt_log_n: u8,

    /// scrypt block size (default: 8).
    #[serde(default = "default_scrypt_r")]
    pub scrypt_r: u32,

    /// scrypt parallelization (default: 1).
    #[serde(default = "default_scrypt_p")]
    pub scrypt_p: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_file() -> String {
    ".bpsecrets/secrets.db".to_string()
}

fn default_scrypt_log_n() -> u8 {
    14
}

fn default_scrypt_r() -> u32 {
    8
}

fn default_scrypt_p() -> u32 {
    1
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_file: default_vault_file(),
            scrypt_log_n: default_scrypt_log_n(),
            scrypt_r: default_scrypt_r(),
            scrypt_p: default_scrypt_p(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".bpsecrets.toml";

    /// Load settings from `<project_dir>/.bpsecrets.toml`.
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
            SecretsError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.kdf_params().validate().map_err(|e| {
            SecretsError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the vault database.
    ///
    /// Example: `project_dir/.bpsecrets/secrets.db`
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_file)
    }

    /// Convert the scrypt settings into crypto-layer params.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            log_n: self.scrypt_log_n,
            r: self.scrypt_r,
            p: self.scrypt_p,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
