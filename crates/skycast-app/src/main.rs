//! SkyCast command line client
//!
//! ```sh
//! # Weather for a named place
//! skycast --query "Los Angeles"
//!
//! # Weather for a coordinate
//! skycast --lat 34.05 --lon -118.24
//!
//! # Weather for the default location from config.toml
//! skycast
//! ```

mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use skycast_core::{AppError, Config};
use skycast_weather::{
    Coordinate, ForecastCoordinator, ForecastState, NominatimGeocoder, OpenMeteoClient,
    StaticLocation,
};
use tokio::task::JoinHandle;

/// Current weather for a place name or coordinate
#[derive(Parser, Debug)]
#[command(name = "skycast", version, about)]
struct Args {
    /// Place name to search for, e.g. "Los Angeles"
    #[arg(long, short, conflicts_with_all = ["lat", "lon"])]
    query: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Config file to use instead of the per-user one
    #[arg(long)]
    config: Option<PathBuf>,
}

/// What the user asked to look up
#[derive(Debug, Clone, PartialEq)]
enum Request {
    Query(String),
    Coordinates(Coordinate),
    DefaultLocation,
}

impl Args {
    fn request(&self) -> Request {
        match (&self.query, self.lat, self.lon) {
            (Some(query), _, _) => Request::Query(query.clone()),
            (None, Some(lat), Some(lon)) => Request::Coordinates(Coordinate::new(lat, lon)),
            _ => Request::DefaultLocation,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = skycast_core::init() {
        eprintln!("Failed to initialize logging: {e:#}");
    }

    match run(args).await {
        Ok(Some((name, state))) => {
            let text = render::render_state(&name, &state);
            if state.error().is_some() {
                eprintln!("{}", text);
                ExitCode::FAILURE
            } else {
                println!("{}", text);
                ExitCode::SUCCESS
            }
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Run one lookup and return the final location name and state.
///
/// Returns `Ok(None)` when interrupted.
async fn run(args: Args) -> Result<Option<(String, ForecastState)>, AppError> {
    let (config, _) = match &args.config {
        Some(path) => Config::load_validated_from(path)?,
        None => Config::load_validated()?,
    };

    let api = OpenMeteoClient::new(config.weather.provider_config())?;
    let geocoder = NominatimGeocoder::new(
        &config.weather.reverse_geocode_url,
        config.weather.timeout(),
        &config.weather.user_agent,
    )?;
    let coordinator = ForecastCoordinator::with_placeholder_name(
        Arc::new(api),
        Arc::new(geocoder),
        config.location.placeholder_name.clone(),
    )?;

    if let Some(handle) = dispatch(&coordinator, &config, args.request()) {
        tokio::select! {
            joined = handle => joined.context("Weather task failed")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, cancelling");
                coordinator.shutdown();
                return Ok(None);
            }
        }
    }

    Ok(Some((coordinator.location_name(), coordinator.state())))
}

/// Issue the coordinator command for `request`.
///
/// Returns `None` when the request was settled without background work.
fn dispatch(
    coordinator: &ForecastCoordinator,
    config: &Config,
    request: Request,
) -> Option<JoinHandle<()>> {
    match request {
        Request::Query(query) => {
            let handle = coordinator.fetch_by_query(&query);
            if handle.is_none() {
                coordinator.report_external_error("Please enter a location to search for");
            }
            handle
        }
        Request::Coordinates(coordinate) if !coordinate.is_valid() => {
            coordinator.report_external_error(format!("Invalid coordinates: {}", coordinate));
            None
        }
        Request::Coordinates(coordinate) => Some(coordinator.fetch_by_coordinates(coordinate)),
        Request::DefaultLocation => {
            let provider = StaticLocation::new(config.location.default_location());
            Some(coordinator.fetch_current_location(Arc::new(provider)))
        }
    }
}
