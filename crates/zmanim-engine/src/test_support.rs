//! Shared fixtures for engine tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use zmanim_astro::{PrimitiveProvider, ProviderError, SolarMode};
use zmanim_core::{CalculatedZman, Location};

pub fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, h, m, s).unwrap()
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

pub fn jerusalem() -> Location {
    Location::new(31.778, 35.235, 754.0, chrono_tz::Asia::Jerusalem).unwrap()
}

pub fn keys(zmanim: &[CalculatedZman]) -> Vec<&str> {
    zmanim.iter().map(|z| z.key.as_str()).collect()
}

/// Deterministic provider for 2025-06-10. 16.1 degree crossings exist,
/// 6 degree crossings report an outage, everything else has no crossing.
pub struct FixedProvider;

impl PrimitiveProvider for FixedProvider {
    fn sunrise(&self, _: NaiveDate, _: &Location) -> Result<DateTime<Utc>, ProviderError> {
        Ok(utc(3, 45, 31))
    }

    fn sunset(&self, _: NaiveDate, _: &Location) -> Result<DateTime<Utc>, ProviderError> {
        Ok(utc(16, 45, 10))
    }

    fn solar_noon(&self, _: NaiveDate, _: &Location) -> Result<DateTime<Utc>, ProviderError> {
        Ok(utc(10, 15, 20))
    }

    fn solar(&self, angle: f64, mode: SolarMode, date: NaiveDate, _: &Location) -> Result<DateTime<Utc>, ProviderError> {
        if (angle - 16.1).abs() < 1e-9 {
            return Ok(match mode {
                SolarMode::BeforeSunrise => utc(2, 10, 0),
                SolarMode::AfterSunset => utc(18, 20, 0),
            });
        }
        if (angle - 6.0).abs() < 1e-9 {
            return Err(ProviderError::Unavailable("ephemeris service down".into()));
        }
        Err(ProviderError::no_crossing(format!("solar({angle}, {mode})"), date))
    }
}
