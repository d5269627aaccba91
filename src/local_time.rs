//! # Local Time Conversion
//!
//! The two data sources disagree about time zones: OpenWeather reports
//! forecast timestamps as naive UTC strings, while NOAA is asked for station
//! local standard/daylight time (`lst_ldt`) and reports naive local strings.
//! Everything downstream works in one configured zone, and every conversion
//! into it goes through this module with the zone passed explicitly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::DashError;

/// OpenWeather `dt_txt` format (UTC)
pub const OPENWEATHER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// NOAA datagetter `t` format (station local time)
pub const NOAA_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Resolve an IANA zone name such as `"US/Pacific"`.
pub fn parse_zone(name: &str) -> Result<Tz, DashError> {
    name.parse::<Tz>()
        .map_err(|_| DashError::Config(format!("unknown timezone {name:?}")))
}

/// Interpret a naive timestamp as UTC and express it in `zone`.
pub fn utc_to_local(naive: NaiveDateTime, zone: Tz) -> DateTime<Tz> {
    zone.from_utc_datetime(&naive)
}

/// Attach `zone` to a naive wall-clock timestamp already in that zone.
///
/// During the autumn DST overlap the earlier of the two instants is chosen.
/// Returns `None` for wall-clock times skipped by the spring transition.
pub fn localize(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&naive).earliest()
}

/// Parse an OpenWeather UTC timestamp into `zone`.
pub fn parse_openweather(text: &str, zone: Tz) -> Option<DateTime<Tz>> {
    NaiveDateTime::parse_from_str(text, OPENWEATHER_FORMAT)
        .ok()
        .map(|naive| utc_to_local(naive, zone))
}

/// Parse a NOAA station-local timestamp into `zone`.
pub fn parse_noaa(text: &str, zone: Tz) -> Option<DateTime<Tz>> {
    NaiveDateTime::parse_from_str(text, NOAA_FORMAT)
        .ok()
        .and_then(|naive| localize(naive, zone))
}

/// The calendar date in `zone` at instant `now`.
pub fn today_in(zone: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&zone).date_naive()
}
