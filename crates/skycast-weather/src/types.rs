use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::condition::WeatherCondition;

/// Format of `current.time` when the forecast is requested with `timezone=auto`
const OBSERVATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True if both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A single ranked result from the location search endpoint.
///
/// Only `name`, `latitude` and `longitude` are guaranteed by the service;
/// the administrative fields are missing for some places (oceans, small
/// islands) so they are optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMatch {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub feature_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1_id: Option<i64>,
    #[serde(default)]
    pub admin2_id: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub country_id: Option<i64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub admin2: Option<String>,
}

impl LocationMatch {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Name shown to the user, e.g. "Los Angeles, US".
    pub fn display_name(&self) -> String {
        match self.country_code.as_deref() {
            Some(code) if !code.is_empty() => format!("{}, {}", self.name, code),
            _ => self.name.clone(),
        }
    }
}

/// Location search response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSearchResponse {
    /// Absent when nothing matched
    #[serde(default)]
    pub results: Vec<LocationMatch>,
    #[serde(default)]
    pub generationtime_ms: f64,
}

/// Current conditions snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub time: String,
    pub interval: i64,
    pub temperature_2m: f64,
    pub wind_speed_10m: f64,
    pub weather_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyUnits {
    pub time: String,
    pub temperature_2m: String,
    pub relative_humidity_2m: String,
    pub wind_speed_10m: String,
    pub pressure_msl: String,
    pub weather_code: String,
}

/// Hourly series; every array is indexed by `time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hourly {
    pub time: Vec<String>,
    pub temperature_2m: Vec<f64>,
    pub relative_humidity_2m: Vec<f64>,
    pub wind_speed_10m: Vec<f64>,
    pub pressure_msl: Vec<f64>,
    pub weather_code: Vec<i32>,
}

impl Hourly {
    fn validate(&self) -> Result<(), WeatherError> {
        let expected = self.time.len();
        check_len("hourly.temperature_2m", self.temperature_2m.len(), expected)?;
        check_len(
            "hourly.relative_humidity_2m",
            self.relative_humidity_2m.len(),
            expected,
        )?;
        check_len("hourly.wind_speed_10m", self.wind_speed_10m.len(), expected)?;
        check_len("hourly.pressure_msl", self.pressure_msl.len(), expected)?;
        check_len("hourly.weather_code", self.weather_code.len(), expected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUnits {
    pub time: String,
    pub weather_code: String,
    pub temperature_2m_max: String,
    pub temperature_2m_min: String,
}

/// Daily series; every array is indexed by `time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Daily {
    pub time: Vec<String>,
    pub weather_code: Vec<i32>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
}

impl Daily {
    fn validate(&self) -> Result<(), WeatherError> {
        let expected = self.time.len();
        check_len("daily.weather_code", self.weather_code.len(), expected)?;
        check_len(
            "daily.temperature_2m_max",
            self.temperature_2m_max.len(),
            expected,
        )?;
        check_len(
            "daily.temperature_2m_min",
            self.temperature_2m_min.len(),
            expected,
        )
    }
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<(), WeatherError> {
    if actual == expected {
        Ok(())
    } else {
        Err(WeatherError::Decode(format!(
            "{field} has {actual} entries, expected {expected}"
        )))
    }
}

/// Complete forecast body as returned by the forecast endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,
    pub current: Current,
    pub hourly_units: HourlyUnits,
    pub hourly: Hourly,
    pub daily_units: DailyUnits,
    pub daily: Daily,
}

impl ForecastPayload {
    /// Check that every hourly and daily series matches its `time` axis.
    pub fn validate(&self) -> Result<(), WeatherError> {
        self.hourly.validate()?;
        self.daily.validate()
    }

    pub fn current_condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.current.weather_code)
    }

    /// Relative humidity of the first hourly slot, in percent
    pub fn current_humidity(&self) -> Option<f64> {
        self.hourly.relative_humidity_2m.first().copied()
    }

    /// Mean-sea-level pressure of the first hourly slot, in hPa
    pub fn current_pressure(&self) -> Option<f64> {
        self.hourly.pressure_msl.first().copied()
    }

    /// Local time of the current snapshot, if it parses.
    pub fn observed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.current.time, OBSERVATION_TIME_FORMAT).ok()
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Location not found: {0}")]
    LocationNotFound(String),
    /// A collaborator call panicked or was aborted
    #[error("Background task failed: {0}")]
    TaskFailed(String),
    #[error("Weather service not initialized")]
    NotInitialized,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const LA_FORECAST: &str = include_str!("../tests/fixtures/los_angeles_forecast.json");

    fn la_payload() -> ForecastPayload {
        serde_json::from_str(LA_FORECAST).unwrap()
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(34.05, -118.24).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.1).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_display() {
        assert_eq!(Coordinate::new(46.81822, 8.2275).to_string(), "46.8182, 8.2275");
    }

    #[test]
    fn test_fixture_decodes_and_validates() {
        let payload = la_payload();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.current.temperature_2m, 25.5);
        assert_eq!(payload.current.weather_code, 2);
        assert_eq!(payload.hourly.time.len(), payload.hourly.pressure_msl.len());
        assert_eq!(payload.daily.time.len(), payload.daily.temperature_2m_min.len());
    }

    #[test]
    fn test_payload_reserializes_to_same_values() {
        let payload = la_payload();
        let json = serde_json::to_value(&payload).unwrap();
        let again: ForecastPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload, again);
    }

    #[test]
    fn test_mismatched_hourly_lengths_fail_validation() {
        let mut payload = la_payload();
        payload.hourly.wind_speed_10m.push(3.0);
        let err = payload.validate().unwrap_err();
        assert!(matches!(err, WeatherError::Decode(_)));
        assert!(err.to_string().contains("hourly.wind_speed_10m"));
    }

    #[test]
    fn test_mismatched_daily_lengths_fail_validation() {
        let mut payload = la_payload();
        payload.daily.weather_code.clear();
        let err = payload.validate().unwrap_err();
        assert!(err.to_string().contains("daily.weather_code"));
    }

    #[test]
    fn test_current_projections() {
        let payload = la_payload();
        assert_eq!(payload.current_humidity(), Some(60.0));
        assert_eq!(payload.current_pressure(), Some(1016.0));
        assert_eq!(payload.current_condition(), WeatherCondition::MainlyClear);
        let observed = payload.observed_at().unwrap();
        assert_eq!(observed.format("%Y-%m-%d %H:%M").to_string(), "2023-03-20 12:00");
    }

    #[test]
    fn test_observed_at_tolerates_bad_time() {
        let mut payload = la_payload();
        payload.current.time = "yesterday".into();
        assert!(payload.observed_at().is_none());
    }

    #[test]
    fn test_location_match_display_name() {
        let json = serde_json::json!({
            "id": 5368361,
            "name": "Los Angeles",
            "latitude": 34.05223,
            "longitude": -118.24368,
            "country_code": "US"
        });
        let m: LocationMatch = serde_json::from_value(json).unwrap();
        assert_eq!(m.display_name(), "Los Angeles, US");
        assert_eq!(m.coordinate(), Coordinate::new(34.05223, -118.24368));
        assert!(m.admin2.is_none());
    }

    #[test]
    fn test_location_match_without_country_code() {
        let json = serde_json::json!({
            "name": "Atlantic Ocean",
            "latitude": 0.0,
            "longitude": -30.0
        });
        let m: LocationMatch = serde_json::from_value(json).unwrap();
        assert_eq!(m.display_name(), "Atlantic Ocean");
    }

    #[test]
    fn test_search_response_without_results_is_empty() {
        let json = serde_json::json!({ "generationtime_ms": 0.52 });
        let resp: LocationSearchResponse = serde_json::from_value(json).unwrap();
        assert!(resp.results.is_empty());
    }

    #[test]
    fn test_error_messages() {
        let status = WeatherError::Status {
            status: 502,
            url: "http://x".into(),
        };
        assert_eq!(status.to_string(), "Unexpected status 502 from http://x");
        assert_eq!(
            WeatherError::LocationNotFound("Atlantis".into()).to_string(),
            "Location not found: Atlantis"
        );
    }
}
