//! Application configuration for Chainworks.
//!
//! User config lives at `~/.chainworks/chainworks.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "chainworks.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".chainworks";

// ---------------------------------------------------------------------------
// Config structs (matching chainworks.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// How definition documents are assembled into catalogs.
    #[serde(default)]
    pub assembler: AssemblerConfig,

    /// Defaults for `chainworks run`.
    #[serde(default)]
    pub run: RunConfig,
}

/// What to do when a definition reuses a name that is already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the assembly run with `DuplicateName`.
    #[default]
    Reject,
    /// Overwrite the existing registration.
    Replace,
}

/// `[assembler]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Explicit name under which the default catalog is also reachable.
    /// Empty means the default catalog is reachable only by the empty name.
    #[serde(default)]
    pub default_catalog: String,

    /// Duplicate registration policy.
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,

    /// Definition files loaded when none are given on the command line.
    #[serde(default)]
    pub definitions: Vec<String>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Catalog searched by `run` when `--catalog` is not given.
    #[serde(default)]
    pub catalog: String,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.chainworks/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChainError::configuration("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.chainworks/chainworks.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChainError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ChainError::configuration(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChainError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChainError::configuration(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChainError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
