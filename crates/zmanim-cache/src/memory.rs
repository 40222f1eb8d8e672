//! [`MemoryStore`] -- process-local cache store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::{CacheError, Result};
use crate::key::{CacheEntry, CacheKey, InvalidationScope};
use crate::traits::CacheStore;

/// `RwLock<HashMap>`-backed store: many readers, one writer at a time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>>> {
        self.entries
            .read()
            .map_err(|e| CacheError::Connection(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>>> {
        self.entries
            .write()
            .map_err(|e| CacheError::Connection(format!("lock poisoned: {e}")))
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        self.write()?.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    fn remove_scope(&self, scope: &InvalidationScope) -> Result<usize> {
        let mut map = self.write()?;
        let before = map.len();
        map.retain(|k, _| !k.in_scope(scope));
        Ok(before - map.len())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut map = self.write()?;
        let before = map.len();
        map.retain(|_, e| !e.is_expired(now));
        Ok(before - map.len())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
