//! # Dashboard Pipeline
//!
//! [`Pipeline`] is built once from an explicit [`Config`] and a
//! [`JsonSource`]; each call to [`Pipeline::load`] performs one complete,
//! independent dashboard load:
//!
//! 1. Five concurrent fetches, each bounded by the request timeout
//! 2. Normalization of every payload into the local zone
//! 3. The merge and the barometric estimate
//!
//! The first failure cancels the remaining fetches and is returned as-is,
//! so the caller never sees a partially populated [`Dashboard`].

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::config::Config;
use crate::error::{ApiCall, DashError};
use crate::local_time;
use crate::merge::{merge, UnifiedRow};
use crate::source::JsonSource;
use crate::tide_data::{self, Product};
use crate::weather::{self, CurrentConditions, ForecastTable};

/// Everything one page render needs.
#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    /// Configured location name, or the one OpenWeather reports
    pub title: String,
    /// NOAA station name from the water-level metadata
    pub station_name: String,
    /// Datum the heights are measured against
    pub datum: String,
    pub generated_at: DateTime<Tz>,
    pub current: CurrentConditions,
    pub forecast: ForecastTable,
    pub rows: Vec<UnifiedRow>,
}

/// A configured, ready-to-run load pipeline.
pub struct Pipeline<S> {
    config: Config,
    zone: Tz,
    request_timeout: Duration,
    source: S,
}

impl<S: JsonSource> Pipeline<S> {
    /// Validate `config` and bind it to `source`.
    pub fn new(config: Config, source: S) -> Result<Self, DashError> {
        config.validate()?;
        let zone = config.zone()?;
        let request_timeout = config.request_timeout();
        Ok(Pipeline {
            config,
            zone,
            request_timeout,
            source,
        })
    }

    /// Override the per-call bound taken from the configuration.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one full load as of `now`.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Dashboard, DashError> {
        let today = local_time::today_in(self.zone, now);
        let location = &self.config.location;
        let station = &self.config.station;
        let key = self.config.api_key.as_str();
        let source = &self.source;

        let (current, forecast, predicted, measured_height, measured_pressure) = tokio::try_join!(
            self.bounded(
                ApiCall::CurrentWeather,
                weather::fetch_current(source, location, key)
            ),
            self.bounded(
                ApiCall::WeatherForecast,
                weather::fetch_forecast(source, location, key, self.zone)
            ),
            self.bounded(
                ApiCall::TidePredictions,
                tide_data::fetch_product(source, station, Product::Predictions, today, self.zone)
            ),
            self.bounded(
                ApiCall::WaterLevel,
                tide_data::fetch_product(source, station, Product::WaterLevel, today, self.zone)
            ),
            self.bounded(
                ApiCall::AirPressure,
                tide_data::fetch_product(source, station, Product::AirPressure, today, self.zone)
            ),
        )?;

        let station_name = measured_height.station_name.clone().ok_or_else(|| {
            DashError::malformed(ApiCall::WaterLevel, "missing field `metadata.name`")
        })?;

        let rows = merge(
            &predicted.series,
            &measured_height.series,
            &measured_pressure.series,
            &forecast.pressure_series(),
        )?;

        log::info!(
            "Loaded {} tide rows, {} forecast rows for {}",
            rows.len(),
            forecast.rows.len(),
            station_name
        );

        let title = if location.name.trim().is_empty() {
            current.location.clone()
        } else {
            location.name.clone()
        };

        Ok(Dashboard {
            title,
            station_name,
            datum: station.datum.clone(),
            generated_at: now.with_timezone(&self.zone),
            current,
            forecast,
            rows,
        })
    }

    // Bound one call; expiry becomes a fetch failure naming it.
    async fn bounded<T, F>(&self, call: ApiCall, fut: F) -> Result<T, DashError>
    where
        F: Future<Output = Result<T, DashError>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("{} timed out after {:?}", call, self.request_timeout);
                Err(DashError::fetch(
                    call,
                    format!("timed out after {:?}", self.request_timeout),
                ))
            }
        }
    }
}
