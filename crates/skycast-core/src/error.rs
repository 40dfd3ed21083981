//! Centralized error types for the SkyCast application.
//!
//! `Display` keeps the full detail for logs; `user_message()` is what gets
//! printed to the terminal.

use skycast_weather::WeatherError;
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => weather_user_message(e),
            // Config loading reports through anyhow with a ConfigError at the root
            AppError::Other(e) => match e.downcast_ref::<ConfigError>() {
                Some(config) => config.user_message(),
                None => "An unexpected error occurred. Please try again.",
            },
        }
    }
}

fn weather_user_message(error: &WeatherError) -> &'static str {
    match error {
        WeatherError::Network(e) if e.is_timeout() => "The request timed out. Please try again.",
        WeatherError::Network(e) if e.is_connect() => {
            "Unable to connect. Check your internet connection."
        }
        WeatherError::Network(_) => "The request failed. Please try again.",
        WeatherError::Status { status, .. } if *status >= 500 => {
            "The weather service is experiencing issues. Please try again later."
        }
        WeatherError::Status { .. } | WeatherError::Decode(_) => "Failed to load weather data",
        WeatherError::LocationNotFound(_) => "Failed to find location",
        WeatherError::TaskFailed(_) => "Something went wrong. Please try again.",
        WeatherError::NotInitialized => "Weather service is not ready. Try restarting the app.",
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more settings failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = [
            AppError::Config(ConfigError::Invalid("test".into())),
            AppError::Weather(WeatherError::Decode("test".into())),
            AppError::Weather(WeatherError::NotInitialized),
            AppError::Weather(WeatherError::TaskFailed("panicked".into())),
            AppError::Other(anyhow::anyhow!("boom")),
        ];

        for e in errors {
            assert!(!e.user_message().is_empty(), "{e:?}");
        }
    }

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = ConfigError::Invalid("weather.timeout_secs".into()).into();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_weather_messages_match_result_state_messages() {
        let not_found = AppError::Weather(WeatherError::LocationNotFound("Atlantis".into()));
        assert_eq!(not_found.user_message(), "Failed to find location");

        let bad_request = AppError::Weather(WeatherError::Status {
            status: 400,
            url: "http://x".into(),
        });
        assert_eq!(bad_request.user_message(), "Failed to load weather data");
    }

    #[test]
    fn test_server_errors_suggest_retrying_later() {
        let err = AppError::Weather(WeatherError::Status {
            status: 503,
            url: "http://x".into(),
        });
        assert_eq!(
            err.user_message(),
            "The weather service is experiencing issues. Please try again later."
        );
    }

    #[test]
    fn test_config_error_inside_anyhow() {
        let inner: anyhow::Error = ConfigError::ParseError("line 1".into()).into();
        let err = AppError::from(inner.context("Failed to load config"));
        assert_eq!(
            err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
        assert!(err.to_string().contains("line 1"));
    }
}
