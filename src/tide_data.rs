//! # NOAA Tide and Pressure Data
//!
//! This module builds NOAA CO-OPS datagetter requests and flattens the
//! responses into [`Series`] for the merge.
//!
//! ## Data Source
//!
//! ### NOAA Tides and Currents
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Products**: `predictions`, `water_level`, `air_pressure`
//! - **Time zone**: `lst_ldt`, station local standard/daylight time
//! - **Units**: `english` (feet, millibars)
//!
//! ### Windows
//! Predictions cover yesterday through five days ahead. Measurements stop
//! at today because they do not exist in the future.
//!
//! ### Response Shapes
//! ```text
//! predictions: { "predictions": [ { "t": "2024-01-15 00:00", "v": "7.519" } ] }
//! water_level: { "metadata": { "name": "Port Townsend", ... },
//!                "data": [ { "t", "v", "s", "f", "q" } ] }
//! air_pressure: { "metadata": {...}, "data": [ { "t", "v", "f" } ] }
//! error:        { "error": { "message": "No data was found..." } }
//! ```
//!
//! Values are JSON strings. They are kept verbatim here and coerced by the
//! merge; the `s`/`f`/`q` quality columns are dropped.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::config::StationConfig;
use crate::error::{ApiCall, DashError};
use crate::local_time;
use crate::source::{decode, JsonSource};
use crate::{Series, TimePoint};

const DATAGETTER: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// Days of history fetched for every product
pub const PAST_DAYS: i64 = 1;

/// Days of predictions fetched beyond today
pub const FUTURE_DAYS: i64 = 5;

/// The three datagetter products used by the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Product {
    Predictions,
    WaterLevel,
    AirPressure,
}

impl Product {
    /// Query-string name of the product.
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Predictions => "predictions",
            Product::WaterLevel => "water_level",
            Product::AirPressure => "air_pressure",
        }
    }

    /// Column label of the normalized series.
    pub fn label(&self) -> &'static str {
        match self {
            Product::Predictions => "Predicted Height",
            Product::WaterLevel => "Measured Height",
            Product::AirPressure => "Measured Pressure",
        }
    }

    pub fn call(&self) -> ApiCall {
        match self {
            Product::Predictions => ApiCall::TidePredictions,
            Product::WaterLevel => ApiCall::WaterLevel,
            Product::AirPressure => ApiCall::AirPressure,
        }
    }

    /// Inclusive `(begin, end)` dates to request relative to `today`.
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let begin = today - Duration::days(PAST_DAYS);
        let end = match self {
            Product::Predictions => today + Duration::days(FUTURE_DAYS),
            Product::WaterLevel | Product::AirPressure => today,
        };
        (begin, end)
    }
}

/// A normalized product response.
#[derive(Clone, Debug, PartialEq)]
pub struct StationSeries {
    pub series: Series<String>,
    /// Station name from the response metadata (absent for predictions)
    pub station_name: Option<String>,
}

// -- Raw payload types --

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    metadata: Option<RawMetadata>,
    #[serde(default)]
    predictions: Option<Vec<RawPoint>>,
    #[serde(default)]
    data: Option<Vec<RawPoint>>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Deserialize)]
struct RawMetadata {
    name: String,
}

#[derive(Deserialize)]
struct RawPoint {
    t: String,
    v: String,
}

#[derive(Deserialize)]
struct RawError {
    message: String,
}

/// Datagetter URL for one product over its window.
pub fn datagetter_url(station: &StationConfig, product: Product, today: NaiveDate) -> String {
    let (begin, end) = product.date_range(today);
    format!(
        "{}?begin_date={}&end_date={}&station={}&product={}&datum={}&time_zone=lst_ldt&units=english&format=json&application=tide-dashboard",
        DATAGETTER,
        begin.format("%Y%m%d"),
        end.format("%Y%m%d"),
        station.id,
        product.as_str(),
        station.datum,
    )
}

/// Flatten one datagetter response.
pub fn normalize(product: Product, payload: Value, zone: Tz) -> Result<StationSeries, DashError> {
    let call = product.call();
    let raw: RawResponse = decode(call, payload)?;

    if let Some(error) = raw.error {
        return Err(DashError::fetch(call, format!("NOAA: {}", error.message)));
    }

    let (key, points) = match product {
        Product::Predictions => ("predictions", raw.predictions),
        Product::WaterLevel | Product::AirPressure => ("data", raw.data),
    };
    let points = points.ok_or_else(|| DashError::malformed(call, format!("missing field `{key}`")))?;

    let points = points
        .into_iter()
        .enumerate()
        .map(|(i, point)| -> Result<TimePoint<String>, DashError> {
            let t = local_time::parse_noaa(&point.t, zone).ok_or_else(|| {
                DashError::malformed(call, format!("bad timestamp {:?} at {key}[{i}]", point.t))
            })?;
            Ok(TimePoint { t, value: point.v })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StationSeries {
        series: Series {
            label: product.label(),
            points,
        },
        station_name: raw.metadata.map(|m| m.name),
    })
}

/// Fetch and normalize one product.
pub async fn fetch_product<S: JsonSource + ?Sized>(
    source: &S,
    station: &StationConfig,
    product: Product,
    today: NaiveDate,
    zone: Tz,
) -> Result<StationSeries, DashError> {
    let payload = source
        .get_json(product.call(), &datagetter_url(station, product, today))
        .await?;
    let normalized = normalize(product, payload, zone)?;
    log::debug!("{}: {} points", product.as_str(), normalized.series.len());
    Ok(normalized)
}
