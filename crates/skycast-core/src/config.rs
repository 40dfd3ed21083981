use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use skycast_weather::geocode::DEFAULT_NOMINATIM_URL;
use skycast_weather::provider::{DEFAULT_FORECAST_BASE_URL, DEFAULT_GEOCODING_BASE_URL};
use skycast_weather::{Coordinate, ProviderConfig, DEFAULT_PLACEHOLDER_NAME};

use crate::error::ConfigError;

/// Most days the forecast endpoint will return
const MAX_FORECAST_DAYS: u8 = 16;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather service endpoints and request settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location naming and fallback position
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the forecast service (`/forecast` is appended)
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,

    /// Base URL of the location search service (`/search` is appended)
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,

    /// Full URL of the reverse geocoding endpoint
    #[serde(default = "default_reverse_geocode_url")]
    pub reverse_geocode_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    /// Number of search matches requested; only the first is used
    #[serde(default = "default_search_count")]
    pub search_count: u8,

    #[serde(default = "default_language")]
    pub language: String,

    /// Sent with every request. Nominatim rejects anonymous clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_forecast_base_url() -> String {
    DEFAULT_FORECAST_BASE_URL.to_string()
}

fn default_geocoding_base_url() -> String {
    DEFAULT_GEOCODING_BASE_URL.to_string()
}

fn default_reverse_geocode_url() -> String {
    DEFAULT_NOMINATIM_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_forecast_days() -> u8 {
    1
}

fn default_search_count() -> u8 {
    1
}

fn default_language() -> String {
    "en".to_string()
}

fn default_user_agent() -> String {
    concat!("SkyCast/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: default_forecast_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            reverse_geocode_url: default_reverse_geocode_url(),
            timeout_secs: default_timeout_secs(),
            forecast_days: default_forecast_days(),
            search_count: default_search_count(),
            language: default_language(),
            user_agent: default_user_agent(),
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settings for the forecast and search client
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            forecast_base_url: self.forecast_base_url.clone(),
            geocoding_base_url: self.geocoding_base_url.clone(),
            timeout: self.timeout(),
            forecast_days: self.forecast_days,
            search_count: self.search_count,
            language: self.language.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Shown when a coordinate has no resolvable place name
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,

    /// Used when no position is given and the device cannot be located
    #[serde(default)]
    pub default_latitude: Option<f64>,

    #[serde(default)]
    pub default_longitude: Option<f64>,
}

fn default_placeholder_name() -> String {
    DEFAULT_PLACEHOLDER_NAME.to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            placeholder_name: default_placeholder_name(),
            default_latitude: None,
            default_longitude: None,
        }
    }
}

impl LocationConfig {
    /// The configured fallback position, if both halves are set.
    pub fn default_location(&self) -> Option<Coordinate> {
        match (self.default_latitude, self.default_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing the default there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::check(Self::load()?)
    }

    /// Same as [`Config::load_validated`] for an explicit path.
    pub fn load_validated_from(path: &Path) -> Result<(Self, ValidationResult)> {
        Self::check(Self::load_from(path)?)
    }

    fn check(config: Self) -> Result<(Self, ValidationResult)> {
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(
            &self.weather.forecast_base_url,
            "weather.forecast_base_url",
            &mut result,
        );
        validate_url(
            &self.weather.geocoding_base_url,
            "weather.geocoding_base_url",
            &mut result,
        );
        validate_url(
            &self.weather.reverse_geocode_url,
            "weather.reverse_geocode_url",
            &mut result,
        );

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 120 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout is unusually long (>120 seconds)",
            );
        }

        if !(1..=MAX_FORECAST_DAYS).contains(&self.weather.forecast_days) {
            result.add_error(
                "weather.forecast_days",
                format!("Forecast days must be between 1 and {}", MAX_FORECAST_DAYS),
            );
        }

        if self.weather.search_count == 0 {
            result.add_error("weather.search_count", "Search count must be at least 1");
        }

        if self.weather.user_agent.trim().is_empty() {
            result.add_warning(
                "weather.user_agent",
                "Empty user agent - reverse geocoding requests may be rejected",
            );
        }

        if self.location.placeholder_name.trim().is_empty() {
            result.add_error(
                "location.placeholder_name",
                "Placeholder name must not be empty",
            );
        }

        match (self.location.default_latitude, self.location.default_longitude) {
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) {
                    result.add_error(
                        "location.default_latitude",
                        format!("Latitude out of range: {}", latitude),
                    );
                }
                if !(-180.0..=180.0).contains(&longitude) {
                    result.add_error(
                        "location.default_longitude",
                        format!("Longitude out of range: {}", longitude),
                    );
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                result.add_error(
                    "location",
                    "default_latitude and default_longitude must be set together",
                );
            }
            (None, None) => {}
        }

        result
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }

            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
