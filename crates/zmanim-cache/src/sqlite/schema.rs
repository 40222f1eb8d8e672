//! DDL for the cache database.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text, so string
//! comparison orders them correctly. Entry payloads are JSON arrays of
//! calculated zmanim.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS zmanim_cache (
        publisher  TEXT NOT NULL,
        locality   TEXT NOT NULL,
        date       TEXT NOT NULL,
        payload    TEXT NOT NULL,
        cached_at  TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        PRIMARY KEY (publisher, locality, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_zmanim_cache_expires ON zmanim_cache (expires_at)",
];

/// Named migrations applied once, in order, after the base DDL.
pub const MIGRATIONS: &[(&str, &str)] = &[];
