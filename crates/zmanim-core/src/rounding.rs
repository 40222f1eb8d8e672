//! Rounding and formatting of exact instants.
//!
//! Rounding happens only here, at formatting time. The exact instant carried
//! by a [`crate::CalculatedZman`] is never rounded.

use chrono::{DateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::enums::RoundingMode;

const EXACT_FORMAT: &str = "%H:%M:%S";
const ROUNDED_FORMAT: &str = "%H:%M";

/// Round a zoned instant to a minute boundary under `mode`.
///
/// Works on the local wall clock, so zones with sub-minute offsets still land
/// on local minute boundaries.
pub fn round_instant<Z: TimeZone>(dt: DateTime<Z>, mode: RoundingMode) -> DateTime<Z> {
    let seconds = dt.second();
    let nanos = dt.nanosecond();
    let floor = dt - TimeDelta::seconds(i64::from(seconds)) - TimeDelta::nanoseconds(i64::from(nanos));
    let up = match mode {
        RoundingMode::Floor => false,
        RoundingMode::Ceil => seconds > 0 || nanos > 0,
        RoundingMode::Math => seconds >= 30,
    };
    if up { floor + TimeDelta::minutes(1) } else { floor }
}

/// Render `instant` in `tz` as `(exact "HH:MM:SS", rounded "HH:MM")`.
pub fn format(instant: DateTime<Utc>, tz: &Tz, mode: RoundingMode) -> (String, String) {
    let local = instant.with_timezone(tz);
    let exact = local.format(EXACT_FORMAT).to_string();
    let rounded = round_instant(local, mode).format(ROUNDED_FORMAT).to_string();
    (exact, rounded)
}
