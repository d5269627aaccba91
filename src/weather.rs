//! # OpenWeather Current Conditions and Forecast
//!
//! Two endpoints are used, both with `units=imperial`:
//!
//! - `/data/2.5/weather` for the current-conditions banner
//! - `/data/2.5/forecast` for the 5-day, 3-hour forecast
//!
//! ## Forecast Payload Shape
//!
//! ```text
//! list[]
//!   .dt_txt        "2024-01-15 03:00:00"  (UTC, no offset)
//!   .main.temp     °F
//!   .main.pressure hPa
//!   .weather[0]    { main, description, icon }   (always a one-element list)
//!   .pop           probability of precipitation, 0..1
//!   .wind          { speed, deg, gust? }
//! ```
//!
//! Normalization is all-or-nothing: a single entry missing a required field
//! rejects the whole payload rather than producing a table with holes.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LocationConfig;
use crate::error::{ApiCall, DashError};
use crate::local_time;
use crate::source::{decode, JsonSource};
use crate::{Series, TimePoint};

const OPENWEATHER_BASE: &str = "https://api.openweathermap.org/data/2.5";

/// Column label for forecast pressure in charts and the merged table.
pub const FORECASTED_PRESSURE: &str = "Forecasted Pressure";

/// Current conditions at the configured location.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentConditions {
    /// Location name reported by OpenWeather
    pub location: String,
    /// Short condition, e.g. "Clouds"
    pub summary: String,
    pub temp_f: f64,
    pub pressure_hpa: f64,
    pub wind_mph: f64,
    pub wind_deg: f64,
}

/// One 3-hour forecast sample, timestamp in the local zone.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastRow {
    pub t: DateTime<Tz>,
    pub temp_f: f64,
    pub pressure_hpa: f64,
    pub description: String,
    pub icon: String,
    /// Probability of precipitation, 0..1
    pub pop: f64,
    pub wind_mph: f64,
    /// Not every forecast entry carries a gust
    pub gust_mph: Option<f64>,
    pub wind_deg: f64,
}

/// Forecast rows in ascending time order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ForecastTable {
    pub rows: Vec<ForecastRow>,
}

impl ForecastTable {
    /// The pressure column as a series for the merge.
    pub fn pressure_series(&self) -> Series<f64> {
        Series {
            label: FORECASTED_PRESSURE,
            points: self
                .rows
                .iter()
                .map(|row| TimePoint {
                    t: row.t,
                    value: row.pressure_hpa,
                })
                .collect(),
        }
    }
}

// -- Raw payload types --

#[derive(Deserialize)]
struct RawForecast {
    list: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    dt_txt: String,
    main: RawMain,
    weather: Vec<RawCondition>,
    pop: f64,
    wind: RawWind,
}

#[derive(Deserialize)]
struct RawMain {
    temp: f64,
    pressure: f64,
}

#[derive(Deserialize)]
struct RawCondition {
    main: String,
    description: String,
    icon: String,
}

#[derive(Deserialize)]
struct RawWind {
    speed: f64,
    deg: f64,
    #[serde(default)]
    gust: Option<f64>,
}

#[derive(Deserialize)]
struct RawCurrent {
    name: String,
    main: RawMain,
    weather: Vec<RawCondition>,
    wind: RawWind,
}

/// URL for the current-weather endpoint.
pub fn current_url(location: &LocationConfig, api_key: &str) -> String {
    format!(
        "{}/weather?lat={}&lon={}&units=imperial&appid={}",
        OPENWEATHER_BASE, location.latitude, location.longitude, api_key
    )
}

/// URL for the 3-hour forecast endpoint.
pub fn forecast_url(location: &LocationConfig, api_key: &str) -> String {
    format!(
        "{}/forecast?lat={}&lon={}&units=imperial&appid={}",
        OPENWEATHER_BASE, location.latitude, location.longitude, api_key
    )
}

/// Flatten a raw forecast payload into a local-zone table.
pub fn normalize_forecast(payload: Value, zone: Tz) -> Result<ForecastTable, DashError> {
    let call = ApiCall::WeatherForecast;
    let raw: RawForecast = decode(call, payload)?;

    let mut rows = raw
        .list
        .into_iter()
        .enumerate()
        .map(|(i, entry)| -> Result<ForecastRow, DashError> {
            let t = local_time::parse_openweather(&entry.dt_txt, zone).ok_or_else(|| {
                DashError::malformed(call, format!("bad timestamp {:?} at list[{i}]", entry.dt_txt))
            })?;
            let condition = entry
                .weather
                .into_iter()
                .next()
                .ok_or_else(|| DashError::malformed(call, format!("empty weather list at list[{i}]")))?;

            Ok(ForecastRow {
                t,
                temp_f: entry.main.temp,
                pressure_hpa: entry.main.pressure,
                description: condition.description,
                icon: condition.icon,
                pop: entry.pop,
                wind_mph: entry.wind.speed,
                gust_mph: entry.wind.gust,
                wind_deg: entry.wind.deg,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    rows.sort_by_key(|row| row.t);
    Ok(ForecastTable { rows })
}

/// Decode the current-weather payload.
pub fn parse_current(payload: Value) -> Result<CurrentConditions, DashError> {
    let call = ApiCall::CurrentWeather;
    let raw: RawCurrent = decode(call, payload)?;
    let condition = raw
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| DashError::malformed(call, "empty weather list"))?;

    Ok(CurrentConditions {
        location: raw.name,
        summary: condition.main,
        temp_f: raw.main.temp,
        pressure_hpa: raw.main.pressure,
        wind_mph: raw.wind.speed,
        wind_deg: raw.wind.deg,
    })
}

/// Fetch and decode the current conditions.
pub async fn fetch_current<S: JsonSource + ?Sized>(
    source: &S,
    location: &LocationConfig,
    api_key: &str,
) -> Result<CurrentConditions, DashError> {
    let payload = source
        .get_json(ApiCall::CurrentWeather, &current_url(location, api_key))
        .await?;
    parse_current(payload)
}

/// Fetch and normalize the forecast.
pub async fn fetch_forecast<S: JsonSource + ?Sized>(
    source: &S,
    location: &LocationConfig,
    api_key: &str,
    zone: Tz,
) -> Result<ForecastTable, DashError> {
    let payload = source
        .get_json(ApiCall::WeatherForecast, &forecast_url(location, api_key))
        .await?;
    let table = normalize_forecast(payload, zone)?;
    log::debug!("forecast: {} rows", table.rows.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures;
    use chrono::Timelike;
    use chrono_tz::US::Pacific;
    use serde_json::json;

    #[test]
    fn test_normalize_forecast_fields() {
        let table = normalize_forecast(fixtures::forecast_json(), Pacific).unwrap();
        assert_eq!(table.rows.len(), 4);

        let first = &table.rows[0];
        // 2024-01-15 00:00 UTC is 16:00 PST the day before
        assert_eq!(first.t.hour(), 16);
        assert_eq!(first.temp_f, 45.3);
        assert_eq!(first.pressure_hpa, 1008.0);
        assert_eq!(first.description, "light rain");
        assert_eq!(first.icon, "10n");
        assert_eq!(first.pop, 0.62);
        assert_eq!(first.wind_mph, 12.1);
        assert_eq!(first.gust_mph, Some(19.4));
        assert_eq!(first.wind_deg, 200.0);
    }

    #[test]
    fn test_missing_gust_is_none() {
        let table = normalize_forecast(fixtures::forecast_json(), Pacific).unwrap();
        assert_eq!(table.rows[1].gust_mph, None);
    }

    #[test]
    fn test_rows_sorted_ascending() {
        let table = normalize_forecast(fixtures::forecast_json(), Pacific).unwrap();
        assert!(table.rows.windows(2).all(|w| w[0].t < w[1].t));
    }

    #[test]
    fn test_missing_nested_pressure_rejects_payload() {
        let mut payload = fixtures::forecast_json();
        payload["list"][2]["main"]
            .as_object_mut()
            .unwrap()
            .remove("pressure");

        let err = normalize_forecast(payload, Pacific).unwrap_err();
        match err {
            DashError::MalformedResponse { call, detail } => {
                assert_eq!(call, ApiCall::WeatherForecast);
                assert!(detail.contains("pressure"), "detail: {detail}");
                assert!(detail.contains("list[2]"), "detail: {detail}");
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_weather_list_rejected() {
        let mut payload = fixtures::forecast_json();
        payload["list"][0]["weather"] = json!([]);
        assert!(matches!(
            normalize_forecast(payload, Pacific),
            Err(DashError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_weather_as_object_rejected() {
        let mut payload = fixtures::forecast_json();
        payload["list"][0]["weather"] = json!({"description": "clear sky", "icon": "01d", "main": "Clear"});
        assert!(matches!(
            normalize_forecast(payload, Pacific),
            Err(DashError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let mut payload = fixtures::forecast_json();
        payload["list"][1]["dt_txt"] = json!("yesterday");
        let err = normalize_forecast(payload, Pacific).unwrap_err();
        assert!(err.to_string().contains("list[1]"), "{err}");
    }

    #[test]
    fn test_pressure_series_label() {
        let table = normalize_forecast(fixtures::forecast_json(), Pacific).unwrap();
        let series = table.pressure_series();
        assert_eq!(series.label, FORECASTED_PRESSURE);
        assert_eq!(series.len(), table.rows.len());
    }

    #[test]
    fn test_parse_current() {
        let current = parse_current(fixtures::current_json()).unwrap();
        assert_eq!(current.location, "Langley");
        assert_eq!(current.summary, "Rain");
        assert_eq!(current.temp_f, 46.2);
        assert_eq!(current.pressure_hpa, 1009.0);
        assert_eq!(current.wind_deg, 190.0);
    }

    #[test]
    fn test_parse_current_missing_name() {
        let mut payload = fixtures::current_json();
        payload.as_object_mut().unwrap().remove("name");
        assert!(matches!(
            parse_current(payload),
            Err(DashError::MalformedResponse { call: ApiCall::CurrentWeather, .. })
        ));
    }

    #[test]
    fn test_urls_carry_location_and_units() {
        let location = fixtures::location();
        let url = forecast_url(&location, "KEY");
        assert!(url.starts_with("https://api.openweathermap.org/data/2.5/forecast?"));
        assert!(url.contains("lat=47.94203"));
        assert!(url.contains("lon=-122.43913"));
        assert!(url.contains("units=imperial"));
        assert!(url.ends_with("appid=KEY"));
        assert!(current_url(&location, "KEY").contains("/weather?"));
    }
}
