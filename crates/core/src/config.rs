//! Application configuration.
//!
//! Values are layered: compiled defaults, then `config.toml` under the
//! user's config directory, then `SNOWSEEKER_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{projection::SortOrder, storage::FileStore};

/// Directory under the user's config directory holding `config.toml`.
pub const CONFIG_DIR: &str = "snowseeker";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SNOWSEEKER";

const DEFAULT_CONFIG: &str = r#"# SnowSeeker configuration.
# Every key is optional; commented values show the built-in behaviour.

# Directory holding saved favorites.
# data_dir = "~/.local/share/snowseeker"

# Resort catalog replacing the bundled one.
# catalog_path = "/path/to/resorts.json"

# Directory receiving snowseeker.log.
# log_dir = "~/.local/share/snowseeker/logs"

# Initial list order: "unsorted", "alphabetical" or "by_country".
# default_sort = "unsorted"
"#;

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for persisted favorites.
    pub data_dir: PathBuf,
    /// Catalog file to load instead of the bundled resorts.
    pub catalog_path: Option<PathBuf>,
    /// Directory receiving log files.
    pub log_dir: PathBuf,
    /// Sort order applied when the list first opens.
    pub default_sort: SortOrder,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = FileStore::default_root();
        Self {
            log_dir: data_dir.join("logs"),
            data_dir,
            catalog_path: None,
            default_sort: SortOrder::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path(), Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(path: &Path, environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        Ok(config)
    }
}

/// Location of `config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default `config.toml` when none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
