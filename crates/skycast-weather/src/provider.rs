//! Open-Meteo forecast and location-search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::types::{Coordinate, ForecastPayload, LocationMatch, LocationSearchResponse, WeatherError};

pub const DEFAULT_FORECAST_BASE_URL: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com/v1";

const HOURLY_FIELDS: &str =
    "temperature_2m,weather_code,relative_humidity_2m,wind_speed_10m,pressure_msl";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";
const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m,weather_code";

/// Settings for [`OpenMeteoClient`]
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub forecast_base_url: String,
    pub geocoding_base_url: String,
    pub timeout: Duration,
    pub forecast_days: u8,
    pub search_count: u8,
    pub language: String,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: DEFAULT_FORECAST_BASE_URL.to_string(),
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            forecast_days: 1,
            search_count: 1,
            language: "en".to_string(),
            user_agent: concat!("SkyCast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Remote weather data source used by the coordinator
#[async_trait]
pub trait ForecastApi: Send + Sync {
    /// Fetch current, hourly and daily data for a coordinate.
    async fn fetch_forecast(&self, coordinate: Coordinate) -> Result<ForecastPayload, WeatherError>;

    /// Ranked matches for a place name. An empty list means "not found".
    async fn search_location(&self, query: &str) -> Result<Vec<LocationMatch>, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    config: ProviderConfig,
}

impl OpenMeteoClient {
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("GET {} returned status {}", url, status);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!("Failed to decode response from {}: {}", url, e);
            WeatherError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl ForecastApi for OpenMeteoClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(&self, coordinate: Coordinate) -> Result<ForecastPayload, WeatherError> {
        let url = format!("{}/forecast", self.config.forecast_base_url);
        let query = [
            ("latitude", coordinate.latitude.to_string()),
            ("longitude", coordinate.longitude.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", self.config.forecast_days.to_string()),
        ];

        let payload: ForecastPayload = self.get_json(&url, &query).await?;
        payload.validate()?;

        tracing::debug!(
            "Forecast for {}: {} hourly / {} daily entries",
            coordinate,
            payload.hourly.time.len(),
            payload.daily.time.len()
        );
        Ok(payload)
    }

    #[instrument(skip(self), level = "info")]
    async fn search_location(&self, query: &str) -> Result<Vec<LocationMatch>, WeatherError> {
        let url = format!("{}/search", self.config.geocoding_base_url);
        let params = [
            ("name", query.to_string()),
            ("count", self.config.search_count.to_string()),
            ("language", self.config.language.clone()),
            ("format", "json".to_string()),
        ];

        let response: LocationSearchResponse = self.get_json(&url, &params).await?;

        if response.results.is_empty() {
            tracing::debug!("No locations matched '{}'", query);
        }
        Ok(response.results)
    }
}
