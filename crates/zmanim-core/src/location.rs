//! Geographic location a calculation runs for.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("latitude {0} out of range (-90..=90)")]
    Latitude(f64),
    #[error("longitude {0} out of range (-180..=180)")]
    Longitude(f64),
    #[error("unknown timezone '{0}'")]
    Timezone(String),
}

/// Coordinates, elevation (meters) and the IANA zone used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    pub timezone: Tz,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, timezone: Tz) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || latitude.is_nan() {
            return Err(LocationError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) || longitude.is_nan() {
            return Err(LocationError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            elevation,
            timezone,
        })
    }

    /// Like [`Location::new`] but takes the timezone by IANA name.
    pub fn with_zone_name(latitude: f64, longitude: f64, elevation: f64, zone: &str) -> Result<Self, LocationError> {
        let tz: Tz = zone
            .parse()
            .map_err(|_| LocationError::Timezone(zone.to_string()))?;
        Self::new(latitude, longitude, elevation, tz)
    }
}
