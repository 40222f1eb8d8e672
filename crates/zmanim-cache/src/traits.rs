//! The [`CacheStore`] trait implemented by every backing store.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::key::{CacheEntry, CacheKey, InvalidationScope};

/// Persistence for cache entries.
///
/// Stores must allow concurrent readers. Writes for the same key may race;
/// the last write wins and both writers computed the same value.
pub trait CacheStore: Send + Sync {
    /// Returns the entry for `key`, expired or not.
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Inserts or replaces the entry for `key`.
    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()>;

    fn remove(&self, key: &CacheKey) -> Result<bool>;

    /// Removes every entry in `scope`, returning how many were removed.
    fn remove_scope(&self, scope: &InvalidationScope) -> Result<usize>;

    /// Removes every entry that expired at or before `now`.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: CacheStore + ?Sized> CacheStore for Box<S> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        (**self).put(key, entry)
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        (**self).remove(key)
    }

    fn remove_scope(&self, scope: &InvalidationScope) -> Result<usize> {
        (**self).remove_scope(scope)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        (**self).purge_expired(now)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
