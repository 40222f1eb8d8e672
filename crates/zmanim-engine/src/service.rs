//! [`ZmanimService`] -- `calculate` behind the cache facade.

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use tracing::info;
use zmanim_astro::PrimitiveProvider;
use zmanim_cache::{CacheFacade, CacheKey, InvalidationScope};
use zmanim_core::{CalculatedZman, sort};

use crate::calculate::{CalculationRequest, FormulaFailure, calculate};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResult {
    pub zmanim: Vec<CalculatedZman>,
    pub from_cache: bool,
    pub cached_at: DateTime<Utc>,
    /// Formulas left out of a fresh calculation. Always empty on a cache hit.
    pub failures: Vec<FormulaFailure>,
}

/// Calculates days for (publisher, locality, date) and memoizes them.
///
/// Cached lists are stored in chronological order and re-sorted on the way
/// out when category-first ordering is requested, so one entry serves both.
pub struct ZmanimService<P> {
    provider: P,
    cache: CacheFacade,
}

impl<P: PrimitiveProvider> ZmanimService<P> {
    pub fn new(provider: P, cache: CacheFacade) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &CacheFacade {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn calculate(
        &self,
        publisher: &str,
        locality: &str,
        request: &CalculationRequest,
    ) -> Result<ServiceResult, EngineError> {
        let key = CacheKey::new(publisher, locality, request.date);
        let failures = RefCell::new(Vec::new());

        let lookup = self.cache.get_or_compute(&key, || {
            let chronological = CalculationRequest {
                sort_by_category: false,
                ..request.clone()
            };
            let calc = calculate(&chronological, &self.provider)?;
            *failures.borrow_mut() = calc.failures;
            Ok::<_, EngineError>(calc.zmanim)
        })?;

        let zmanim = if request.sort_by_category {
            sort::sort(lookup.zmanim, true)
        } else {
            lookup.zmanim
        };
        Ok(ServiceResult {
            zmanim,
            from_cache: lookup.from_cache,
            cached_at: lookup.cached_at,
            failures: failures.into_inner(),
        })
    }

    /// Drop every cached day for `publisher`. Returns the number removed.
    pub fn invalidate_publisher(&self, publisher: &str) -> zmanim_cache::Result<usize> {
        info!(publisher, "formula change, invalidating publisher");
        self.cache.invalidate(&InvalidationScope::Publisher(publisher.to_string()))
    }

    pub fn invalidate_locality(&self, publisher: &str, locality: &str) -> zmanim_cache::Result<usize> {
        self.cache.invalidate(&InvalidationScope::Locality {
            publisher: publisher.to_string(),
            locality: locality.to_string(),
        })
    }
}
