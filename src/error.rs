//! # Dashboard Error Taxonomy
//!
//! Every failure in a dashboard load is one of four kinds. None of them is
//! recoverable at the point of occurrence: the load is aborted and the
//! presentation layer shows the error instead of a partial page.
//!
//! | Variant             | Raised by                          |
//! |---------------------|------------------------------------|
//! | `Fetch`             | network errors, non-2xx, timeouts  |
//! | `MalformedResponse` | missing or wrongly shaped fields   |
//! | `DataShape`         | numeric coercion during the merge  |
//! | `Config`            | missing configuration or secrets   |

use std::fmt;
use thiserror::Error;

/// One of the five external calls issued per dashboard load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiCall {
    CurrentWeather,
    WeatherForecast,
    TidePredictions,
    WaterLevel,
    AirPressure,
}

impl ApiCall {
    /// Human-readable name used in log lines and error pages.
    pub fn name(&self) -> &'static str {
        match self {
            ApiCall::CurrentWeather => "current weather",
            ApiCall::WeatherForecast => "weather forecast",
            ApiCall::TidePredictions => "tide predictions",
            ApiCall::WaterLevel => "water level",
            ApiCall::AirPressure => "air pressure",
        }
    }
}

impl fmt::Display for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can abort a dashboard load.
#[derive(Error, Debug)]
pub enum DashError {
    /// Network failure, non-2xx status, API-reported error, or timeout
    #[error("{call} fetch failed: {reason}")]
    Fetch { call: ApiCall, reason: String },

    /// Expected field missing or of the wrong shape
    #[error("malformed {call} response: {detail}")]
    MalformedResponse { call: ApiCall, detail: String },

    /// A value that should be numeric could not be coerced
    #[error("non-numeric {column} value {value:?} at {at}")]
    DataShape {
        column: &'static str,
        at: String,
        value: String,
    },

    /// Required configuration or secret missing or invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl DashError {
    pub(crate) fn fetch(call: ApiCall, reason: impl fmt::Display) -> Self {
        DashError::Fetch {
            call,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(call: ApiCall, detail: impl fmt::Display) -> Self {
        DashError::MalformedResponse {
            call,
            detail: detail.to_string(),
        }
    }

    /// The external call that failed, if the error came from one.
    pub fn call(&self) -> Option<ApiCall> {
        match self {
            DashError::Fetch { call, .. } | DashError::MalformedResponse { call, .. } => {
                Some(*call)
            }
            DashError::DataShape { .. } | DashError::Config(_) => None,
        }
    }
}
