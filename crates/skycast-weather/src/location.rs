//! Device location contract.
//!
//! Platform shells implement [`LocationProvider`]; the coordinator only needs
//! a coordinate or a reason why there isn't one.

use async_trait::async_trait;

use crate::types::Coordinate;

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    /// Message suitable for display; passed through to the result state as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => "Location permission denied. Please grant permission to see the weather for your current location.".to_string(),
            Self::ServiceUnavailable => {
                "Could not retrieve location. Please ensure location services are enabled."
                    .to_string()
            }
            Self::Timeout => "Timed out while getting your location. Please try again.".to_string(),
            Self::Other(detail) => format!("Failed to get location: {}", detail),
        }
    }
}

/// Source of the device's current position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<Coordinate, LocationError>;
}

/// Provider that always reports a fixed position, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticLocation {
    coordinate: Option<Coordinate>,
}

impl StaticLocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current_location(&self) -> Result<Coordinate, LocationError> {
        self.coordinate.ok_or(LocationError::ServiceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = [
            LocationError::PermissionDenied,
            LocationError::ServiceUnavailable,
            LocationError::Timeout,
            LocationError::Other("gps off".into()),
        ];
        for e in errors {
            assert!(!e.user_message().is_empty(), "{e:?}");
        }
    }

    #[test]
    fn test_other_includes_detail() {
        let msg = LocationError::Other("provider crashed".into()).user_message();
        assert_eq!(msg, "Failed to get location: provider crashed");
    }

    #[test]
    fn test_static_location_reports_configured_coordinate() {
        let provider = StaticLocation::new(Some(Coordinate::new(48.2, 16.37)));
        assert_eq!(
            tokio_test::block_on(provider.current_location()),
            Ok(Coordinate::new(48.2, 16.37))
        );
    }

    #[test]
    fn test_static_location_without_coordinate_is_unavailable() {
        let provider = StaticLocation::default();
        assert_eq!(
            tokio_test::block_on(provider.current_location()),
            Err(LocationError::ServiceUnavailable)
        );
    }
}
