//! [`SqliteStore`] -- SQLite-backed cache store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::key::{CacheEntry, CacheKey, InvalidationScope};
use crate::sqlite::schema;
use crate::traits::CacheStore;

/// SQLite implementation of [`CacheStore`].
///
/// Wraps a [`rusqlite::Connection`] in a `Mutex`. Writes use
/// `INSERT OR REPLACE`, so two batches racing on the same key are harmless.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CacheError::corrupt(key, format!("bad timestamp '{raw}': {e}")))
}

impl SqliteStore {
    /// Opens (or creates) a cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening SQLite cache");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Connection(format!("failed to create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| CacheError::Connection(format!("failed to open {}: {e}", path.display())))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.configure_connection()?;
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory SQLite cache");
        let conn = Connection::open_in_memory()
            .map_err(|e| CacheError::Connection(format!("failed to open in-memory db: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.configure_connection()?;
        store.init_schema()?;
        Ok(store)
    }

    fn configure_connection(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| CacheError::Connection(format!("failed to set pragmas: {e}")))?;
        Ok(())
    }

    /// Creates tables if needed, then applies pending migrations.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let version: Option<i32> = conn
            .query_row("SELECT value FROM metadata WHERE key = 'schema_version'", [], |row| {
                let v: String = row.get(0)?;
                Ok(v.parse::<i32>().unwrap_or(0))
            })
            .ok();
        if let Some(v) = version.filter(|v| *v >= schema::CURRENT_SCHEMA_VERSION) {
            debug!(version = v, "cache schema current, skipping init");
            return Ok(());
        }

        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).map_err(|e| CacheError::Migration {
                name: "init_schema".into(),
                reason: e.to_string(),
            })?;
        }

        for &(name, sql) in schema::MIGRATIONS {
            let key = format!("migration:{name}");
            let applied: bool = conn
                .query_row("SELECT COUNT(*) FROM metadata WHERE key = ?1", params![key], |row| {
                    row.get::<_, i32>(0)
                })
                .unwrap_or(0)
                > 0;
            if applied {
                continue;
            }
            debug!(name, "applying migration");
            conn.execute_batch(sql).map_err(|e| CacheError::Migration {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, 'applied')",
                params![key],
            )?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
            params![schema::CURRENT_SCHEMA_VERSION.to_string()],
        )?;
        info!("cache schema initialized (version {})", schema::CURRENT_SCHEMA_VERSION);
        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Connection(format!("mutex poisoned: {e}")))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let conn = self.lock_conn()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT payload, cached_at, expires_at FROM zmanim_cache
                 WHERE publisher = ?1 AND locality = ?2 AND date = ?3",
                params![key.publisher, key.locality, key.date.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        drop(conn);

        let Some((payload, cached_at, expires_at)) = row else {
            return Ok(None);
        };
        let id = key.to_string();
        Ok(Some(CacheEntry {
            zmanim: serde_json::from_str(&payload)?,
            cached_at: parse_timestamp(&id, &cached_at)?,
            expires_at: parse_timestamp(&id, &expires_at)?,
        }))
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.zmanim)?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO zmanim_cache
                (publisher, locality, date, payload, cached_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.publisher,
                key.locality,
                key.date.to_string(),
                payload,
                timestamp(entry.cached_at),
                timestamp(entry.expires_at),
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        let conn = self.lock_conn()?;
        let n = conn.execute(
            "DELETE FROM zmanim_cache WHERE publisher = ?1 AND locality = ?2 AND date = ?3",
            params![key.publisher, key.locality, key.date.to_string()],
        )?;
        Ok(n > 0)
    }

    fn remove_scope(&self, scope: &InvalidationScope) -> Result<usize> {
        let conn = self.lock_conn()?;
        let n = match scope {
            InvalidationScope::All => conn.execute("DELETE FROM zmanim_cache", [])?,
            InvalidationScope::Publisher(p) => {
                conn.execute("DELETE FROM zmanim_cache WHERE publisher = ?1", params![p])?
            }
            InvalidationScope::Locality { publisher, locality } => conn.execute(
                "DELETE FROM zmanim_cache WHERE publisher = ?1 AND locality = ?2",
                params![publisher, locality],
            )?,
        };
        Ok(n)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock_conn()?;
        let n = conn.execute(
            "DELETE FROM zmanim_cache WHERE expires_at <= ?1",
            params![timestamp(now)],
        )?;
        Ok(n)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM zmanim_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}
