//! Configuration types and loading.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
const ENV_PREFIX: &str = "ZMANIM_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// A layer (file or environment) held a value of the wrong shape.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local; nothing survives the run.
    #[default]
    Memory,
    /// SQLite file under the `.zmanim` directory.
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// SQLite file, relative to the `.zmanim` directory unless absolute.
    #[serde(default = "default_cache_path")]
    pub path: String,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_cache_path() -> String {
    "cache.db".to_string()
}

fn default_ttl_hours() -> u32 {
    24
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Order by time-of-day category before time.
    #[serde(default)]
    pub category_order: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` env-filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

// ---------------------------------------------------------------------------
// ZmanimConfig
// ---------------------------------------------------------------------------

/// Contents of `.zmanim/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZmanimConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl ZmanimConfig {
    /// Resolve the SQLite cache path against `base` (normally the
    /// `.zmanim` directory).
    pub fn cache_path(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.cache.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// Loading / saving
// ---------------------------------------------------------------------------

fn layered(file: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(ZmanimConfig::default()));
    if let Some(path) = file {
        // An empty file is valid and contributes nothing.
        let has_content = path.exists() && !std::fs::read_to_string(path)?.trim().is_empty();
        if has_content {
            debug!(?path, "merging config file");
            figment = figment.merge(Yaml::file(path));
        }
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}

fn extract(figment: Figment) -> Result<ZmanimConfig> {
    figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
}

/// Load configuration for a `.zmanim` directory (or defaults plus
/// environment when there is none).
pub fn load_config(zmanim_dir: Option<&Path>) -> Result<ZmanimConfig> {
    let file = zmanim_dir.map(|d| d.join(CONFIG_FILE_NAME));
    extract(layered(file.as_deref())?)
}

/// Load configuration from an explicit file. The file must exist.
pub fn load_config_file(path: &Path) -> Result<ZmanimConfig> {
    if !path.exists() {
        return Err(ConfigError::ReadError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    extract(layered(Some(path))?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
