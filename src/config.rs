//! # Configuration Management
//!
//! This module loads the dashboard configuration from `tide-config.toml`
//! and the OpenWeather API key from the `OPENWEATHER_API` environment
//! variable. The key never lives in the file.
//!
//! Unlike a display that can fall back to a default station, the dashboard
//! has no sensible defaults for the location, station, or key: anything
//! missing fails fast with [`DashError::Config`]. Only the `[http]` and
//! `[server]` sections have defaults.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::DashError;
use crate::local_time;

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_PATH: &str = "tide-config.toml";

/// Environment variable holding the OpenWeather API key
pub const API_KEY_VAR: &str = "OPENWEATHER_API";

/// Application configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Forecast location and display zone
    pub location: LocationConfig,
    /// NOAA station settings
    pub station: StationConfig,
    /// Outbound request settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Dashboard server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// OpenWeather API key, from the environment
    #[serde(skip)]
    pub api_key: String,
}

/// Forecast location
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Display name for the page header
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone all timestamps are shown and joined in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// NOAA tide station
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StationConfig {
    /// NOAA station ID (e.g., "9444900" for Port Townsend, WA)
    pub id: String,
    /// Tidal datum heights are reported against (e.g., "MLLW")
    pub datum: String,
}

/// Outbound HTTP settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Upper bound for each external call, in seconds
    pub request_timeout_secs: u64,
}

/// Dashboard server settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
}

fn default_timezone() -> String {
    "US/Pacific".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            request_timeout_secs: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:8050".to_string(),
        }
    }
}

impl Config {
    /// Load from the given file and the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DashError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| DashError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&contents, env::var(API_KEY_VAR).ok())?;
        log::info!(
            "Loaded configuration for station {} ({})",
            config.station.id,
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate configuration text with an explicitly supplied key.
    pub fn from_toml_str(contents: &str, api_key: Option<String>) -> Result<Self, DashError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| DashError::Config(format!("invalid config file: {e}")))?;
        config.api_key = api_key.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check every field the pipeline depends on.
    pub fn validate(&self) -> Result<(), DashError> {
        let require = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(DashError::Config(what.to_string()))
            }
        };

        let lat = self.location.latitude;
        let lon = self.location.longitude;
        require(
            lat.is_finite() && (-90.0..=90.0).contains(&lat),
            "location.latitude must be between -90 and 90",
        )?;
        require(
            lon.is_finite() && (-180.0..=180.0).contains(&lon),
            "location.longitude must be between -180 and 180",
        )?;
        require(!self.station.id.trim().is_empty(), "station.id is required")?;
        require(!self.station.datum.trim().is_empty(), "station.datum is required")?;
        require(
            !self.api_key.trim().is_empty(),
            "OPENWEATHER_API environment variable is not set",
        )?;
        require(self.http.request_timeout_secs > 0, "http.request_timeout_secs must be positive")?;
        self.zone()?;
        Ok(())
    }

    /// The configured display zone.
    pub fn zone(&self) -> Result<Tz, DashError> {
        local_time::parse_zone(&self.location.timezone)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[location]
name = "Maxwelton Beach"
latitude = 47.94203
longitude = -122.43913
timezone = "US/Pacific"

[station]
id = "9444900"
datum = "MLLW"
"#;

    fn key() -> Option<String> {
        Some("test-key".to_string())
    }

    #[test]
    fn test_parse_with_defaults() {
        let config = Config::from_toml_str(SAMPLE, key()).unwrap();
        assert_eq!(config.station.id, "9444900");
        assert_eq!(config.station.datum, "MLLW");
        assert_eq!(config.location.name, "Maxwelton Beach");
        assert_eq!(config.http.request_timeout_secs, 10);
        assert_eq!(config.server.bind, "127.0.0.1:8050");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.zone().unwrap(), chrono_tz::US::Pacific);
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let err = Config::from_toml_str(SAMPLE, None).unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR), "{err}");

        let err = Config::from_toml_str(SAMPLE, Some("  ".to_string())).unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn test_missing_station_section_fails() {
        let text = SAMPLE.replace("[station]\nid = \"9444900\"\ndatum = \"MLLW\"\n", "");
        assert!(matches!(Config::from_toml_str(&text, key()), Err(DashError::Config(_))));
    }

    #[test]
    fn test_missing_latitude_fails() {
        let text = SAMPLE.replace("latitude = 47.94203\n", "");
        let err = Config::from_toml_str(&text, key()).unwrap_err();
        assert!(err.to_string().contains("latitude"), "{err}");
    }

    #[test]
    fn test_empty_datum_fails() {
        let text = SAMPLE.replace("datum = \"MLLW\"", "datum = \"\"");
        let err = Config::from_toml_str(&text, key()).unwrap_err();
        assert!(err.to_string().contains("station.datum"), "{err}");
    }

    #[test]
    fn test_out_of_range_longitude_fails() {
        let text = SAMPLE.replace("-122.43913", "-222.0");
        assert!(Config::from_toml_str(&text, key()).is_err());
    }

    #[test]
    fn test_unknown_timezone_fails() {
        let text = SAMPLE.replace("US/Pacific", "Pacific/Atlantis");
        let err = Config::from_toml_str(&text, key()).unwrap_err();
        assert!(err.to_string().contains("timezone"), "{err}");
    }

    #[test]
    fn test_http_override() {
        let text = format!("{SAMPLE}\n[http]\nrequest_timeout_secs = 3\n");
        let config = Config::from_toml_str(&text, key()).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = Config::load_from_path("/nonexistent/path/tide-config.toml").unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn test_load_from_file_reads_station() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        // Key comes from the environment, which tests do not control;
        // either outcome must be a config result, never a panic.
        match Config::load_from_path(file.path()) {
            Ok(config) => assert_eq!(config.station.id, "9444900"),
            Err(DashError::Config(msg)) => assert!(msg.contains(API_KEY_VAR), "{msg}"),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
}
