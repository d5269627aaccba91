//! # JSON Sources
//!
//! Every external GET goes through [`JsonSource`], so the pipeline can be
//! exercised against canned payloads in tests and against the network in
//! production. [`HttpSource`] is the `reqwest` implementation.
//!
//! ## Error Mapping
//!
//! - Connection and protocol failures → [`DashError::Fetch`]
//! - Non-2xx status → [`DashError::Fetch`] with the status code
//! - Body that is not JSON → [`DashError::MalformedResponse`]
//!
//! Timeouts are applied by the pipeline around each call, not here, so the
//! same bound holds for any source.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiCall, DashError};

/// Something that can answer a GET with a JSON document.
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn get_json(&self, call: ApiCall, url: &str) -> Result<Value, DashError>;
}

/// `reqwest`-backed source for the live APIs.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a client whose transport timeout matches the per-call bound.
    pub fn new(timeout: Duration) -> Result<Self, DashError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tide-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashError::Config(format!("HTTP client: {e}")))?;
        Ok(HttpSource { client })
    }
}

#[async_trait]
impl JsonSource for HttpSource {
    async fn get_json(&self, call: ApiCall, url: &str) -> Result<Value, DashError> {
        log::debug!("GET {} ({})", redact(url), call);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DashError::fetch(call, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::fetch(call, format!("HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DashError::malformed(call, e.without_url()))
    }
}

/// Decode a JSON document into `T`, reporting the path of the first bad
/// field (e.g. `list[3].main.pressure`).
pub(crate) fn decode<T: DeserializeOwned>(call: ApiCall, value: Value) -> Result<T, DashError> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = e.path().to_string();
        DashError::malformed(call, format!("{} at {}", e.into_inner(), path))
    })
}

/// Mask the OpenWeather key in a URL before it reaches the log.
pub fn redact(url: &str) -> String {
    match url.find("appid=") {
        Some(start) => {
            let value_start = start + "appid=".len();
            let value_end = url[value_start..]
                .find('&')
                .map_or(url.len(), |i| value_start + i);
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Inner,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        pressure: f64,
    }

    #[test]
    fn test_redact_middle_and_end() {
        assert_eq!(
            redact("https://x/weather?lat=1&appid=SECRET&units=imperial"),
            "https://x/weather?lat=1&appid=***&units=imperial"
        );
        assert_eq!(redact("https://x/weather?appid=SECRET"), "https://x/weather?appid=***");
        assert_eq!(redact("https://x/datagetter?station=1"), "https://x/datagetter?station=1");
    }

    #[test]
    fn test_decode_reports_missing_path() {
        let err = decode::<Outer>(ApiCall::WeatherForecast, json!({"inner": {}})).unwrap_err();
        match err {
            DashError::MalformedResponse { call, detail } => {
                assert_eq!(call, ApiCall::WeatherForecast);
                assert!(detail.contains("pressure"), "detail: {detail}");
                assert!(detail.contains("inner"), "detail: {detail}");
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_http_source_builds() {
        assert!(HttpSource::new(Duration::from_secs(5)).is_ok());
    }
}
