use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use zmanim_core::Location;

/// Which side of the day an angle crossing is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarMode {
    /// Morning crossing, before sunrise.
    BeforeSunrise,
    /// Evening crossing, after sunset.
    AfterSunset,
}

impl SolarMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeSunrise => "before_sunrise",
            Self::AfterSunset => "after_sunset",
        }
    }

    /// Parse a DSL mode keyword.
    ///
    /// Every direction that names the morning edge of the day (`before_noon`,
    /// `after_sunrise`, the `visible` and `geometric` spellings) selects the
    /// morning crossing; every evening one selects the evening crossing.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "before_sunrise" | "after_sunrise" | "before_noon" | "before_visible_sunrise" | "after_visible_sunrise"
            | "before_geometric_sunrise" | "after_geometric_sunrise" => Some(Self::BeforeSunrise),
            "after_sunset" | "before_sunset" | "after_noon" | "before_visible_sunset" | "after_visible_sunset"
            | "before_geometric_sunset" | "after_geometric_sunset" => Some(Self::AfterSunset),
            _ => None,
        }
    }
}

impl fmt::Display for SolarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The sun never reaches the requested position on this date (polar
    /// day/night, or an angle deeper than the sun gets).
    #[error("no crossing for {primitive} on {date}")]
    NoCrossing { primitive: String, date: NaiveDate },

    /// The provider itself failed. Aborts the whole batch.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn no_crossing(primitive: impl Into<String>, date: NaiveDate) -> Self {
        Self::NoCrossing {
            primitive: primitive.into(),
            date,
        }
    }

    pub fn is_no_crossing(&self) -> bool {
        matches!(self, Self::NoCrossing { .. })
    }
}

/// Source of astronomical primitive instants.
///
/// Implementations must be deterministic for a given date and location.
pub trait PrimitiveProvider: Send + Sync {
    fn sunrise(&self, date: NaiveDate, location: &Location) -> Result<DateTime<Utc>, ProviderError>;

    fn sunset(&self, date: NaiveDate, location: &Location) -> Result<DateTime<Utc>, ProviderError>;

    fn solar_noon(&self, date: NaiveDate, location: &Location) -> Result<DateTime<Utc>, ProviderError>;

    /// Instant the sun is `angle` degrees below the horizon on the `mode`
    /// side of the day.
    fn solar(
        &self,
        angle: f64,
        mode: SolarMode,
        date: NaiveDate,
        location: &Location,
    ) -> Result<DateTime<Utc>, ProviderError>;
}

impl<P: PrimitiveProvider + ?Sized> PrimitiveProvider for &P {
    fn sunrise(&self, date: NaiveDate, location: &Location) -> Result<DateTime<Utc>, ProviderError> {
        (**self).sunrise(date, location)
    }

    fn sunset(&self, date: NaiveDate, location: &Location) -> Result<DateTime<Utc>, ProviderError> {
        (**self).sunset(date, location)
    }

    fn solar_noon(&self, date: NaiveDate, location: &Location) -> Result<DateTime<Utc>, ProviderError> {
        (**self).solar_noon(date, location)
    }

    fn solar(
        &self,
        angle: f64,
        mode: SolarMode,
        date: NaiveDate,
        location: &Location,
    ) -> Result<DateTime<Utc>, ProviderError> {
        (**self).solar(angle, mode, date, location)
    }
}
