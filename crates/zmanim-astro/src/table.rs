//! Provider backed by a precomputed ephemeris table.
//!
//! A table covers one site: it maps dates to sunrise, sunset, solar noon and
//! any number of depression-angle crossings. Useful for tests, fixtures and
//! offline runs where a published almanac is the source of truth.
//!
//! ```yaml
//! days:
//!   2025-03-14:
//!     sunrise: 2025-03-14T04:48:12Z
//!     sunset: 2025-03-14T16:45:40Z
//!     solar_noon: 2025-03-14T10:46:56Z
//!     crossings:
//!       - angle: 16.1
//!         before_sunrise: 2025-03-14T03:28:05Z
//!         after_sunset: 2025-03-14T18:05:51Z
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zmanim_core::Location;

use crate::provider::{PrimitiveProvider, ProviderError, SolarMode};

/// Angles closer than this are considered the same crossing.
const ANGLE_EPSILON: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum EphemerisError {
    #[error("ephemeris parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One depression-angle crossing. `None` means the sun does not reach the
/// angle on that side of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarCrossing {
    pub angle: f64,
    #[serde(default)]
    pub before_sunrise: Option<DateTime<Utc>>,
    #[serde(default)]
    pub after_sunset: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EphemerisDay {
    #[serde(default)]
    pub sunrise: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sunset: Option<DateTime<Utc>>,
    #[serde(default)]
    pub solar_noon: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crossings: Vec<SolarCrossing>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EphemerisTable {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, EphemerisDay>,
}

impl EphemerisTable {
    pub fn parse_yaml(content: &str) -> Result<Self, EphemerisError> {
        serde_yaml::from_str(content).map_err(|e| EphemerisError::Parse(e.to_string()))
    }

    pub fn parse_json(content: &str) -> Result<Self, EphemerisError> {
        serde_json::from_str(content).map_err(|e| EphemerisError::Parse(e.to_string()))
    }

    /// Load a table, picking JSON for `.json` and YAML otherwise.
    pub fn load(path: &Path) -> Result<Self, EphemerisError> {
        let content = std::fs::read_to_string(path)?;
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::parse_json(&content)?,
            _ => Self::parse_yaml(&content)?,
        };
        debug!(path = %path.display(), days = table.days.len(), "loaded ephemeris table");
        Ok(table)
    }
}

/// [`PrimitiveProvider`] answering from an [`EphemerisTable`].
///
/// The location argument is not consulted; the table already describes one
/// site.
#[derive(Debug, Clone)]
pub struct TableProvider {
    table: EphemerisTable,
}

impl TableProvider {
    pub fn new(table: EphemerisTable) -> Self {
        Self { table }
    }

    pub fn load(path: &Path) -> Result<Self, EphemerisError> {
        EphemerisTable::load(path).map(Self::new)
    }

    fn day(&self, date: NaiveDate) -> Result<&EphemerisDay, ProviderError> {
        self.table
            .days
            .get(&date)
            .ok_or_else(|| ProviderError::Unavailable(format!("no ephemeris entry for {date}")))
    }

    fn field(
        &self,
        date: NaiveDate,
        name: &str,
        pick: impl FnOnce(&EphemerisDay) -> Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, ProviderError> {
        pick(self.day(date)?).ok_or_else(|| ProviderError::no_crossing(name, date))
    }
}

impl PrimitiveProvider for TableProvider {
    fn sunrise(&self, date: NaiveDate, _location: &Location) -> Result<DateTime<Utc>, ProviderError> {
        self.field(date, "sunrise", |d| d.sunrise)
    }

    fn sunset(&self, date: NaiveDate, _location: &Location) -> Result<DateTime<Utc>, ProviderError> {
        self.field(date, "sunset", |d| d.sunset)
    }

    fn solar_noon(&self, date: NaiveDate, _location: &Location) -> Result<DateTime<Utc>, ProviderError> {
        self.field(date, "solar_noon", |d| d.solar_noon)
    }

    fn solar(
        &self,
        angle: f64,
        mode: SolarMode,
        date: NaiveDate,
        _location: &Location,
    ) -> Result<DateTime<Utc>, ProviderError> {
        let name = format!("solar({angle}, {mode})");
        self.field(date, &name, |d| {
            let crossing = d
                .crossings
                .iter()
                .find(|c| (c.angle - angle).abs() < ANGLE_EPSILON)?;
            match mode {
                SolarMode::BeforeSunrise => crossing.before_sunrise,
                SolarMode::AfterSunset => crossing.after_sunset,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const TABLE: &str = r#"
days:
  2025-03-14:
    sunrise: 2025-03-14T04:48:12Z
    sunset: 2025-03-14T16:45:40Z
    solar_noon: 2025-03-14T10:46:56Z
    crossings:
      - angle: 16.1
        before_sunrise: 2025-03-14T03:28:05Z
        after_sunset: 2025-03-14T18:05:51Z
      - angle: 30
        before_sunrise: null
"#;

    fn loc() -> Location {
        Location::new(31.778, 35.235, 754.0, chrono_tz::Asia::Jerusalem).unwrap()
    }

    fn provider() -> TableProvider {
        TableProvider::new(EphemerisTable::parse_yaml(TABLE).unwrap())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn serves_basic_primitives() {
        let p = provider();
        assert_eq!(
            p.sunrise(date(), &loc()).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 14, 4, 48, 12).unwrap()
        );
        assert_eq!(
            p.solar_noon(date(), &loc()).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 14, 10, 46, 56).unwrap()
        );
    }

    #[test]
    fn serves_angle_crossings() {
        let p = provider();
        let alos = p.solar(16.1, SolarMode::BeforeSunrise, date(), &loc()).unwrap();
        assert_eq!(alos, Utc.with_ymd_and_hms(2025, 3, 14, 3, 28, 5).unwrap());
    }

    #[test]
    fn null_or_missing_crossing_is_no_crossing() {
        let p = provider();
        let err = p.solar(30.0, SolarMode::BeforeSunrise, date(), &loc()).unwrap_err();
        assert!(err.is_no_crossing());
        let err = p.solar(12.0, SolarMode::AfterSunset, date(), &loc()).unwrap_err();
        assert!(err.is_no_crossing());
    }

    #[test]
    fn missing_date_is_unavailable() {
        let p = provider();
        let other = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert!(matches!(p.sunset(other, &loc()), Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn loads_json_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eph.json");
        std::fs::write(
            &path,
            r#"{"days":{"2025-03-14":{"sunrise":"2025-03-14T04:48:12Z"}}}"#,
        )
        .unwrap();
        let p = TableProvider::load(&path).unwrap();
        assert!(p.sunrise(date(), &loc()).is_ok());
        assert!(p.sunset(date(), &loc()).unwrap_err().is_no_crossing());
    }
}
