//! # Series Merger
//!
//! Aligns the four normalized series into one table anchored on the tide
//! predictions. The NOAA series share the prediction timestamps (same
//! station, same 6-minute clock), so they are joined on exact time. The
//! forecast comes from a different provider on a 3-hour cadence, so each
//! prediction row takes the latest forecast sample at or before it.
//!
//! Output rows always match the prediction rows one-for-one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::DashError;
use crate::pressure::estimate_rise;
use crate::Series;

/// One row of the unified tide table.
///
/// Measured columns are `None` outside the measurement window (the past
/// day). `forecasted_pressure` is `None` before the first forecast sample.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnifiedRow {
    pub t: DateTime<Tz>,
    pub predicted_height: f64,
    pub measured_height: Option<f64>,
    pub measured_pressure: Option<f64>,
    pub forecasted_pressure: Option<f64>,
    pub estimated_height: Option<f64>,
}

/// Build the unified table.
///
/// `predicted`, `measured_height` and `measured_pressure` carry raw NOAA
/// strings. Every prediction and every non-blank measurement must parse as
/// a finite number or the merge fails with [`DashError::DataShape`]; blank
/// measurements become `None`. `forecast` need not be sorted.
pub fn merge(
    predicted: &Series<String>,
    measured_height: &Series<String>,
    measured_pressure: &Series<String>,
    forecast: &Series<f64>,
) -> Result<Vec<UnifiedRow>, DashError> {
    let heights = exact_index(measured_height)?;
    let pressures = exact_index(measured_pressure)?;

    let mut forecast_points: Vec<(DateTime<Utc>, f64)> = forecast
        .points
        .iter()
        .map(|p| (p.t.with_timezone(&Utc), p.value))
        .collect();
    forecast_points.sort_by_key(|(t, _)| *t);

    predicted
        .points
        .iter()
        .map(|point| -> Result<UnifiedRow, DashError> {
            let key = point.t.with_timezone(&Utc);
            let predicted_height = coerce(predicted.label, &point.t, &point.value)?;
            let forecasted_pressure = nearest_prior(&forecast_points, key);
            let estimated_height = estimate_rise(forecasted_pressure).map(|r| predicted_height + r);

            Ok(UnifiedRow {
                t: point.t,
                predicted_height,
                measured_height: heights.get(&key).copied(),
                measured_pressure: pressures.get(&key).copied(),
                forecasted_pressure,
                estimated_height,
            })
        })
        .collect()
}

/// Value of the latest sample with `t <= at`, if any. `sorted` must be
/// ascending by time.
pub fn nearest_prior(sorted: &[(DateTime<Utc>, f64)], at: DateTime<Utc>) -> Option<f64> {
    let idx = sorted.partition_point(|(t, _)| *t <= at);
    idx.checked_sub(1).map(|i| sorted[i].1)
}

/// Parse a raw NOAA value as a finite number.
pub fn coerce(column: &'static str, at: &DateTime<Tz>, raw: &str) -> Result<f64, DashError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DashError::DataShape {
            column,
            at: at.format("%Y-%m-%d %H:%M %Z").to_string(),
            value: raw.to_string(),
        }),
    }
}

// Coerces every point, including ones no prediction row will look up.
// A blank value is NOAA's marker for a missing sample and is left out.
fn exact_index(series: &Series<String>) -> Result<HashMap<DateTime<Utc>, f64>, DashError> {
    series
        .points
        .iter()
        .filter(|p| !p.value.trim().is_empty())
        .map(|p| -> Result<(DateTime<Utc>, f64), DashError> {
            Ok((p.t.with_timezone(&Utc), coerce(series.label, &p.t, &p.value)?))
        })
        .collect()
}
