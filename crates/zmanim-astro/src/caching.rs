//! Memoizing decorator for primitive providers.
//!
//! The cache is injected rather than global, so tests and long-running hosts
//! can decide its lifetime and backing.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use zmanim_core::Location;

use crate::provider::{PrimitiveProvider, ProviderError, SolarMode};

/// Which primitive a cached value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Sunrise,
    Sunset,
    SolarNoon,
    /// Angle stored as raw `f64` bits so the key stays hashable.
    Solar { angle_bits: u64, mode: SolarMode },
}

/// Identity of one provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveKey {
    pub date: NaiveDate,
    latitude_bits: u64,
    longitude_bits: u64,
    elevation_bits: u64,
    pub primitive: Primitive,
}

impl PrimitiveKey {
    pub fn new(date: NaiveDate, location: &Location, primitive: Primitive) -> Self {
        Self {
            date,
            latitude_bits: location.latitude.to_bits(),
            longitude_bits: location.longitude.to_bits(),
            elevation_bits: location.elevation.to_bits(),
            primitive,
        }
    }
}

pub type Outcome = Result<DateTime<Utc>, ProviderError>;

/// Storage for memoized provider outcomes.
pub trait PrimitiveCache: Send + Sync {
    fn get(&self, key: &PrimitiveKey) -> Option<Outcome>;
    fn put(&self, key: PrimitiveKey, outcome: Outcome);
}

/// Process-local [`PrimitiveCache`].
///
/// Entries are never evicted on their own. Long-lived hosts should call
/// [`retain_dates`](Self::retain_dates) or [`clear`](Self::clear) as the
/// calendar moves on.
#[derive(Debug, Default)]
pub struct MemoryPrimitiveCache {
    entries: RwLock<HashMap<PrimitiveKey, Outcome>>,
}

impl MemoryPrimitiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut m) = self.entries.write() {
            m.clear();
        }
    }

    /// Drops entries for dates outside `from..=to`. Returns how many were
    /// removed.
    pub fn retain_dates(&self, from: NaiveDate, to: NaiveDate) -> usize {
        let Ok(mut m) = self.entries.write() else { return 0 };
        let before = m.len();
        m.retain(|key, _| (from..=to).contains(&key.date));
        let removed = before - m.len();
        debug!(removed, %from, %to, "evicted primitive cache entries");
        removed
    }
}

impl PrimitiveCache for MemoryPrimitiveCache {
    fn get(&self, key: &PrimitiveKey) -> Option<Outcome> {
        // A poisoned lock only costs a recomputation.
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: PrimitiveKey, outcome: Outcome) {
        if let Ok(mut m) = self.entries.write() {
            m.insert(key, outcome);
        }
    }
}

/// Wraps a provider and memoizes its answers in `C`.
///
/// `NoCrossing` is a fact about the sky and is cached; `Unavailable` is a
/// fault of the provider and is not.
pub struct CachingProvider<P, C = MemoryPrimitiveCache> {
    inner: P,
    cache: C,
}

impl<P: PrimitiveProvider> CachingProvider<P, MemoryPrimitiveCache> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: MemoryPrimitiveCache::new(),
        }
    }
}

impl<P: PrimitiveProvider, C: PrimitiveCache> CachingProvider<P, C> {
    pub fn with_cache(inner: P, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn memo(&self, key: PrimitiveKey, compute: impl FnOnce(&P) -> Outcome) -> Outcome {
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let outcome = compute(&self.inner);
        match &outcome {
            Err(ProviderError::Unavailable(_)) => {
                debug!(?key, "not caching provider failure");
            }
            _ => self.cache.put(key, outcome.clone()),
        }
        outcome
    }
}

impl<P: PrimitiveProvider, C: PrimitiveCache> PrimitiveProvider for CachingProvider<P, C> {
    fn sunrise(&self, date: NaiveDate, location: &Location) -> Outcome {
        let key = PrimitiveKey::new(date, location, Primitive::Sunrise);
        self.memo(key, |p| p.sunrise(date, location))
    }

    fn sunset(&self, date: NaiveDate, location: &Location) -> Outcome {
        let key = PrimitiveKey::new(date, location, Primitive::Sunset);
        self.memo(key, |p| p.sunset(date, location))
    }

    fn solar_noon(&self, date: NaiveDate, location: &Location) -> Outcome {
        let key = PrimitiveKey::new(date, location, Primitive::SolarNoon);
        self.memo(key, |p| p.solar_noon(date, location))
    }

    fn solar(&self, angle: f64, mode: SolarMode, date: NaiveDate, location: &Location) -> Outcome {
        let primitive = Primitive::Solar {
            angle_bits: angle.to_bits(),
            mode,
        };
        let key = PrimitiveKey::new(date, location, primitive);
        self.memo(key, |p| p.solar(angle, mode, date, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; fails `solar` with the configured error.
    struct Counting {
        calls: AtomicUsize,
        solar_error: Option<ProviderError>,
    }

    impl Counting {
        fn new(solar_error: Option<ProviderError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                solar_error,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap())
        }
    }

    impl PrimitiveProvider for Counting {
        fn sunrise(&self, _: NaiveDate, _: &Location) -> Outcome {
            self.tick()
        }
        fn sunset(&self, _: NaiveDate, _: &Location) -> Outcome {
            self.tick()
        }
        fn solar_noon(&self, _: NaiveDate, _: &Location) -> Outcome {
            self.tick()
        }
        fn solar(&self, _: f64, _: SolarMode, _: NaiveDate, _: &Location) -> Outcome {
            let ok = self.tick();
            match &self.solar_error {
                Some(e) => Err(e.clone()),
                None => ok,
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn here() -> Location {
        Location::new(40.7, -74.0, 10.0, chrono_tz::Tz::UTC).unwrap()
    }

    #[test]
    fn repeated_calls_hit_cache() {
        let provider = CachingProvider::new(Counting::new(None));
        let loc = here();
        provider.sunrise(date(), &loc).unwrap();
        provider.sunrise(date(), &loc).unwrap();
        provider.solar(16.1, SolarMode::BeforeSunrise, date(), &loc).unwrap();
        provider.solar(16.1, SolarMode::BeforeSunrise, date(), &loc).unwrap();
        assert_eq!(provider.inner().calls(), 2);
        assert_eq!(provider.cache().len(), 2);
    }

    #[test]
    fn distinct_locations_do_not_collide() {
        let provider = CachingProvider::new(Counting::new(None));
        let a = here();
        let mut b = here();
        b.elevation = 800.0;
        provider.sunset(date(), &a).unwrap();
        provider.sunset(date(), &b).unwrap();
        assert_eq!(provider.inner().calls(), 2);
    }

    #[test]
    fn no_crossing_is_cached() {
        let err = ProviderError::no_crossing("solar", date());
        let provider = CachingProvider::new(Counting::new(Some(err.clone())));
        let loc = here();
        assert_eq!(provider.solar(18.0, SolarMode::AfterSunset, date(), &loc), Err(err.clone()));
        assert_eq!(provider.solar(18.0, SolarMode::AfterSunset, date(), &loc), Err(err));
        assert_eq!(provider.inner().calls(), 1);
    }

    #[test]
    fn retain_dates_evicts_outside_window() {
        let provider = CachingProvider::new(Counting::new(None));
        let loc = here();
        for day in 1..=5 {
            let d = NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
            provider.sunrise(d, &loc).unwrap();
        }
        assert_eq!(provider.cache().len(), 5);

        let from = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        assert_eq!(provider.cache().retain_dates(from, to), 3);
        assert_eq!(provider.cache().len(), 2);

        provider.sunrise(from, &loc).unwrap();
        provider.sunrise(date(), &loc).unwrap();
        assert_eq!(provider.inner().calls(), 6);
    }

    #[test]
    fn unavailable_is_not_cached() {
        let err = ProviderError::Unavailable("offline".into());
        let provider = CachingProvider::new(Counting::new(Some(err)));
        let loc = here();
        assert!(provider.solar(18.0, SolarMode::AfterSunset, date(), &loc).is_err());
        assert!(provider.solar(18.0, SolarMode::AfterSunset, date(), &loc).is_err());
        assert_eq!(provider.inner().calls(), 2);
        assert!(provider.cache().is_empty());
    }
}
