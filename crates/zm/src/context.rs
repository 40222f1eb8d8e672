//! Runtime context for command execution.
//!
//! [`RuntimeContext`] holds what every handler needs: global flags, the
//! resolved `.zmanim` directory and the layered configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::TimeDelta;
use zmanim_cache::{CacheFacade, MemoryStore, SqliteStore};
use zmanim_config::{CacheBackend, ZmanimConfig, find_zmanim_dir, load_config, load_config_file};

use crate::cli::GlobalArgs;

#[derive(Debug)]
pub struct RuntimeContext {
    pub json: bool,
    pub verbose: bool,

    /// `.zmanim` directory, or the directory holding an explicit `--config`.
    pub zmanim_dir: Option<PathBuf>,

    pub config: ZmanimConfig,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// An explicit `--config` file must exist. Otherwise the nearest
    /// `.zmanim` directory is used if there is one; environment overrides
    /// apply in both cases.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let (zmanim_dir, config) = match &global.config {
            Some(path) => {
                let config = load_config_file(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?;
                (path.parent().map(Path::to_path_buf), config)
            }
            None => {
                let cwd = env::current_dir().context("cannot determine working directory")?;
                let dir = find_zmanim_dir(&cwd);
                let config = load_config(dir.as_deref()).context("failed to load configuration")?;
                (dir, config)
            }
        };

        Ok(Self {
            json: global.json,
            verbose: global.verbose,
            zmanim_dir,
            config,
        })
    }

    /// `tracing` filter directive: `--verbose` wins, then the config.
    /// `RUST_LOG` is honored by the caller before either.
    pub fn log_filter(&self) -> &str {
        if self.verbose { "debug" } else { &self.config.log.filter }
    }

    /// Open the configured cache backend.
    pub fn cache_facade(&self) -> Result<CacheFacade> {
        let ttl = TimeDelta::hours(i64::from(self.config.cache.ttl_hours));
        let facade = match self.config.cache.backend {
            CacheBackend::Memory => CacheFacade::new(MemoryStore::new()),
            CacheBackend::Sqlite => {
                let Some(dir) = &self.zmanim_dir else {
                    bail!(
                        "sqlite cache configured but no .zmanim directory found\n\
                         Hint: create .zmanim/ in the project or pass --config"
                    );
                };
                let path = self.config.cache_path(dir);
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("failed to open cache database: {}", path.display()))?;
                CacheFacade::new(store)
            }
        };
        Ok(facade.with_ttl(ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(config: ZmanimConfig, dir: Option<PathBuf>) -> RuntimeContext {
        RuntimeContext {
            json: false,
            verbose: false,
            zmanim_dir: dir,
            config,
        }
    }

    #[test]
    fn verbose_overrides_configured_filter() {
        let mut c = ctx(ZmanimConfig::default(), None);
        assert_eq!(c.log_filter(), "warn");
        c.verbose = true;
        assert_eq!(c.log_filter(), "debug");
    }

    #[test]
    fn sqlite_backend_needs_a_directory() {
        let mut config = ZmanimConfig::default();
        config.cache.backend = CacheBackend::Sqlite;
        assert!(ctx(config.clone(), None).cache_facade().is_err());

        let tmp = tempfile::TempDir::new().unwrap();
        let facade = ctx(config, Some(tmp.path().to_path_buf())).cache_facade().unwrap();
        assert_eq!(facade.ttl(), TimeDelta::hours(24));
        assert!(tmp.path().join("cache.db").exists());
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let mut config = ZmanimConfig::default();
        config.cache.ttl_hours = u32::MAX;
        let facade = ctx(config, None).cache_facade().unwrap();
        assert_eq!(facade.ttl(), TimeDelta::days(zmanim_cache::MAX_TTL_DAYS));
    }
}
