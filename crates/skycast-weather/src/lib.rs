//! Weather service for SkyCast
//!
//! Provides forecast and location-search data via the Open-Meteo API,
//! reverse geocoding via Nominatim, and the coordinator that turns those
//! calls into a single published result state.

pub mod condition;
pub mod coordinator;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod result_state;
pub mod types;

pub use condition::{weather_status, WeatherCondition};
pub use coordinator::{
    ForecastCoordinator, ForecastState, Generation, DEFAULT_PLACEHOLDER_NAME,
    FORECAST_FAILED_MESSAGE, SEARCH_FAILED_MESSAGE,
};
pub use geocode::{NominatimGeocoder, ReverseGeocoder};
pub use location::{LocationError, LocationProvider, StaticLocation};
pub use provider::{ForecastApi, OpenMeteoClient, ProviderConfig};
pub use result_state::ResultState;
pub use types::*;
