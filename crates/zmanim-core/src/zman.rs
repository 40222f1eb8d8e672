use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::enums::{RoundingMode, TimeCategory};
use crate::rounding;

/// One calculated day-event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedZman {
    pub key: String,
    /// Exact, unrounded instant.
    pub instant: DateTime<Utc>,
    /// `HH:MM:SS` in the location's zone.
    pub exact: String,
    /// `HH:MM` in the location's zone, rounded under `rounding_mode`.
    pub rounded: String,
    /// Unix seconds of the exact instant.
    pub timestamp: i64,
    #[serde(default)]
    pub category: TimeCategory,
    #[serde(default)]
    pub rounding_mode: RoundingMode,
}

impl CalculatedZman {
    pub fn new(
        key: impl Into<String>,
        instant: DateTime<Utc>,
        tz: &Tz,
        rounding_mode: RoundingMode,
        category: TimeCategory,
    ) -> Self {
        let (exact, rounded) = rounding::format(instant, tz, rounding_mode);
        Self {
            key: key.into(),
            instant,
            exact,
            rounded,
            timestamp: instant.timestamp(),
            category,
            rounding_mode,
        }
    }
}
