//! # Tide Dashboard Core Library
//!
//! This library fetches weather data from OpenWeather and tide data from
//! NOAA Tides & Currents for one location and one tide station, aligns the
//! series on time, and estimates how much low barometric pressure will lift
//! the predicted tide.
//!
//! ## Data Flow
//!
//! 1. **Fetch**: five concurrent GETs (current weather, forecast, tide
//!    predictions, water level, air pressure) through a [`source::JsonSource`]
//! 2. **Normalize**: each payload becomes a flat, chronologically ordered
//!    [`Series`] (or forecast table) in the configured local time zone
//! 3. **Merge**: predictions anchor a left join of the measurements; the
//!    3-hourly forecast pressure is joined nearest-prior
//! 4. **Estimate**: [`pressure::estimate_rise`] adds the barometric
//!    correction to each row
//! 5. **Render**: [`renderer`] turns the resulting [`pipeline::Dashboard`]
//!    into HTML or an ASCII summary
//!
//! Nothing is cached between loads; every refresh recomputes from scratch.
//!
//! ## Core Types
//!
//! - [`TimePoint`]: one timestamped value
//! - [`Series`]: a labelled, ordered run of time points

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

pub mod chart;
pub mod config;
pub mod error;
pub mod local_time;
pub mod merge;
pub mod pipeline;
pub mod pressure;
pub mod renderer;
pub mod server;
pub mod source;
pub mod tide_data;
pub mod weather;

#[cfg(test)]
mod tests;

pub use error::{ApiCall, DashError};

/// A single sample of one quantity at a local-zone instant.
///
/// NOAA values stay as the raw strings the API returned (`V = String`)
/// until the merge coerces them; forecast values are numeric from the
/// start (`V = f64`).
///
/// # Example
/// ```
/// use chrono::TimeZone;
/// use chrono_tz::US::Pacific;
/// use tide_dash_lib::TimePoint;
///
/// let point = TimePoint {
///     t: Pacific.with_ymd_and_hms(2024, 1, 15, 6, 36, 0).unwrap(),
///     value: "9.871".to_string(),
/// };
/// assert_eq!(point.value, "9.871");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimePoint<V> {
    /// Sample time in the configured local zone
    pub t: DateTime<Tz>,
    /// Sample value
    pub value: V,
}

/// A labelled, chronologically ordered series of samples.
///
/// The label is the column name used in charts and error messages, e.g.
/// `"Predicted Height"` or `"Forecasted Pressure"`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series<V> {
    /// Column name
    pub label: &'static str,
    /// Samples in ascending time order
    pub points: Vec<TimePoint<V>>,
}

impl<V> Series<V> {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
