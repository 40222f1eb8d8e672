//! [`CacheFacade`] -- the cache contract seen by callers.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};
use zmanim_core::CalculatedZman;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::key::{CacheEntry, CacheKey, InvalidationScope};
use crate::traits::CacheStore;

pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Longest accepted TTL. Longer values are clamped so `expires_at` stays
/// within the four-digit years an RFC 3339 timestamp can hold.
pub const MAX_TTL_DAYS: i64 = 365 * 1000;

/// Result of [`CacheFacade::get_or_compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub zmanim: Vec<CalculatedZman>,
    pub from_cache: bool,
    /// When the returned list was computed. On a hit this is the original
    /// store time, not the time of the lookup.
    pub cached_at: DateTime<Utc>,
}

/// Memoizes calculated days per (publisher, locality, date).
///
/// Store failures never fail a lookup: a read error is a miss and a write
/// error leaves the fresh result uncached. Both are logged.
pub struct CacheFacade {
    store: Box<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl CacheFacade {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: impl CacheStore + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Box::new(store),
            clock,
            ttl: TimeDelta::hours(DEFAULT_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        let max = TimeDelta::days(MAX_TTL_DAYS);
        if ttl > max {
            warn!(requested_hours = ttl.num_hours(), max_days = MAX_TTL_DAYS, "cache TTL clamped");
        }
        self.ttl = ttl.min(max);
        self
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// Returns the live entry for `key`, dropping it if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = match self.store.get(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        if entry.is_expired(self.clock.now()) {
            debug!(%key, "cache entry expired");
            if let Err(e) = self.store.remove(key) {
                warn!(%key, error = %e, "failed to drop expired cache entry");
            }
            return None;
        }
        Some(entry)
    }

    /// Returns the cached day for `key`, or runs `compute`, stores its
    /// result and returns it. Errors from `compute` are passed through and
    /// nothing is stored.
    pub fn get_or_compute<E, F>(&self, key: &CacheKey, compute: F) -> std::result::Result<CacheLookup, E>
    where
        F: FnOnce() -> std::result::Result<Vec<CalculatedZman>, E>,
    {
        if let Some(entry) = self.get(key) {
            debug!(%key, "cache hit");
            return Ok(CacheLookup {
                zmanim: entry.zmanim,
                from_cache: true,
                cached_at: entry.cached_at,
            });
        }

        debug!(%key, "cache miss");
        let zmanim = compute()?;
        let cached_at = self.clock.now();
        let entry = CacheEntry {
            zmanim,
            cached_at,
            expires_at: cached_at.checked_add_signed(self.ttl).unwrap_or(cached_at),
        };
        if let Err(e) = self.store.put(key, &entry) {
            warn!(%key, error = %e, "cache write failed");
        }
        Ok(CacheLookup {
            zmanim: entry.zmanim,
            from_cache: false,
            cached_at,
        })
    }

    /// Drops every entry in `scope`. Call after any formula, tag or rounding
    /// change affecting that scope.
    pub fn invalidate(&self, scope: &InvalidationScope) -> Result<usize> {
        let removed = self.store.remove_scope(scope)?;
        info!(%scope, removed, "invalidated zmanim cache");
        Ok(removed)
    }

    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired(self.clock.now())?;
        debug!(removed, "purged expired cache entries");
        Ok(removed)
    }
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}
