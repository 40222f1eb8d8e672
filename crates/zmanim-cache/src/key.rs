use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use zmanim_core::CalculatedZman;

/// Identity of one cached day: `publisher:locality:date`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub publisher: String,
    pub locality: String,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn new(publisher: impl Into<String>, locality: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            publisher: publisher.into(),
            locality: locality.into(),
            date,
        }
    }

    pub fn in_scope(&self, scope: &InvalidationScope) -> bool {
        match scope {
            InvalidationScope::All => true,
            InvalidationScope::Publisher(p) => &self.publisher == p,
            InvalidationScope::Locality { publisher, locality } => {
                &self.publisher == publisher && &self.locality == locality
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.publisher, self.locality, self.date)
    }
}

/// A cached, ordered day of zmanim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub zmanim: Vec<CalculatedZman>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Which entries an invalidation removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Every locality and date of one publisher.
    Publisher(String),
    /// Every date of one publisher at one locality.
    Locality { publisher: String, locality: String },
    All,
}

impl fmt::Display for InvalidationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publisher(p) => write!(f, "{p}:*"),
            Self::Locality { publisher, locality } => write!(f, "{publisher}:{locality}:*"),
            Self::All => f.write_str("*"),
        }
    }
}
