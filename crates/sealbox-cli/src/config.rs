use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use sealbox_core::adapter::ExecutionMode;
use sealbox_storage::options::KeyringOptions;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/sealbox/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Override for data directory (encrypted file backend).
    pub data_dir: Option<PathBuf>,
    /// Which secure backend holds the entries.
    pub backend: BackendKind,
    /// Namespace used when `--namespace` is not given.
    pub namespace: Option<String>,
    /// Where JSON encode/decode runs.
    pub execution: ExecutionMode,
    /// Keychain addressing for the keyring backend and the file backend's data key.
    pub keyring: KeyringOptions,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// AES-GCM encrypted files, data key in the OS keychain.
    #[default]
    File,
    /// Entries stored directly as OS keychain credentials.
    Keyring,
    /// Process-local map; nothing survives the command. For smoke runs.
    Memory,
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("sealbox").join("config.toml"))
}

/// Write the given config to the default path unless a file already exists there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_if_missing(config, &default_path()?)
}

/// Write the config to `path`, creating parent directories as needed.
/// An existing file is left untouched to avoid clobbering user edits.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
