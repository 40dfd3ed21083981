//! Forecast coordinator: "resolve location, then fetch forecast" sequencing.
//!
//! Every public command starts a new generation. Publishes are tagged with the
//! generation that produced them and dropped once a newer one has started, so
//! a slow earlier fetch can never overwrite a later result. Superseded work is
//! also cancelled through the generation's token.
//!
//! The display layer reads state through `watch` receivers and never mutates
//! it.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::geocode::ReverseGeocoder;
use crate::location::LocationProvider;
use crate::provider::ForecastApi;
use crate::result_state::ResultState;
use crate::types::{Coordinate, ForecastPayload, WeatherError};

pub const FORECAST_FAILED_MESSAGE: &str = "Failed to load weather data";
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to find location";
pub const DEFAULT_PLACEHOLDER_NAME: &str = "Current Location";
const UNSPECIFIED_ERROR_MESSAGE: &str = "An unexpected error occurred";

pub type ForecastState = ResultState<ForecastPayload>;

/// Sequence number of a top-level command
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Search,
    Forecast,
}

impl Stage {
    fn user_message(self) -> &'static str {
        match self {
            Stage::Search => SEARCH_FAILED_MESSAGE,
            Stage::Forecast => FORECAST_FAILED_MESSAGE,
        }
    }
}

#[derive(Debug)]
struct FetchFailure {
    stage: Stage,
    source: WeatherError,
}

impl FetchFailure {
    fn search(source: WeatherError) -> Self {
        Self {
            stage: Stage::Search,
            source,
        }
    }

    fn forecast(source: WeatherError) -> Self {
        Self {
            stage: Stage::Forecast,
            source,
        }
    }
}

#[derive(Debug)]
struct ActiveGeneration {
    generation: Generation,
    cancel: CancellationToken,
}

impl ActiveGeneration {
    /// Results land only for the current generation, and not after shutdown.
    fn accepts(&self, generation: Generation) -> bool {
        self.generation == generation && !self.cancel.is_cancelled()
    }
}

struct Shared {
    api: Arc<dyn ForecastApi>,
    geocoder: Arc<dyn ReverseGeocoder>,
    placeholder_name: String,
    active: Mutex<ActiveGeneration>,
    state_tx: watch::Sender<ForecastState>,
    name_tx: watch::Sender<String>,
}

impl Shared {
    /// Supersede whatever is running and publish the new generation's first state.
    fn begin(&self, initial: ForecastState) -> (Generation, CancellationToken) {
        let mut active = self.active.lock();
        Self::advance(&mut active, &self.state_tx, initial)
    }

    /// Like `begin`, but only if `from` is still the active generation.
    fn begin_after(
        &self,
        from: Generation,
        initial: ForecastState,
    ) -> Option<(Generation, CancellationToken)> {
        let mut active = self.active.lock();
        if active.generation != from {
            tracing::debug!("Generation {} superseded, not continuing", from);
            return None;
        }
        Some(Self::advance(&mut active, &self.state_tx, initial))
    }

    fn advance(
        active: &mut ActiveGeneration,
        state_tx: &watch::Sender<ForecastState>,
        initial: ForecastState,
    ) -> (Generation, CancellationToken) {
        active.cancel.cancel();
        active.generation += 1;
        active.cancel = CancellationToken::new();
        state_tx.send_replace(initial);
        (active.generation, active.cancel.clone())
    }

    fn publish_state(&self, generation: Generation, state: ForecastState) -> bool {
        let active = self.active.lock();
        if !active.accepts(generation) {
            tracing::debug!(
                "Dropping stale result from generation {} (current {})",
                generation,
                active.generation
            );
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    fn publish_name(&self, generation: Generation, name: String) -> bool {
        let active = self.active.lock();
        if !active.accepts(generation) {
            tracing::debug!("Dropping stale location name '{}' from generation {}", name, generation);
            return false;
        }
        self.name_tx.send_replace(name);
        true
    }

    async fn resolve_name(&self, coordinate: Coordinate) -> String {
        let geocoder = self.geocoder.clone();
        let lookup = isolate(async move { geocoder.reverse_geocode(coordinate).await }).await;
        match lookup {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => {
                tracing::debug!("No place name for {}, using placeholder", coordinate);
                self.placeholder_name.clone()
            }
            Err(e) => {
                tracing::debug!("Reverse geocoding failed for {}: {}", coordinate, e);
                self.placeholder_name.clone()
            }
        }
    }

    async fn coordinates_sequence(
        self: Arc<Self>,
        generation: Generation,
        coordinate: Coordinate,
    ) -> Result<ForecastPayload, FetchFailure> {
        let name_stage = async {
            let name = self.resolve_name(coordinate).await;
            self.publish_name(generation, name);
        };
        let api = self.api.clone();
        let forecast = isolate(async move { api.fetch_forecast(coordinate).await });
        let (_, forecast) = tokio::join!(name_stage, forecast);
        forecast.map_err(FetchFailure::forecast)
    }

    async fn query_sequence(
        self: Arc<Self>,
        generation: Generation,
        query: String,
    ) -> Result<ForecastPayload, FetchFailure> {
        let api = self.api.clone();
        let search_query = query.clone();
        let matches = isolate(async move { api.search_location(&search_query).await })
            .await
            .map_err(FetchFailure::search)?;

        let Some(best) = matches.into_iter().next() else {
            return Err(FetchFailure::search(WeatherError::LocationNotFound(query)));
        };

        let name = best.display_name();
        let coordinate = best.coordinate();
        tracing::info!("Resolved '{}' to {} ({})", query, name, coordinate);
        self.publish_name(generation, name);

        let api = self.api.clone();
        isolate(async move { api.fetch_forecast(coordinate).await })
            .await
            .map_err(FetchFailure::forecast)
    }
}

/// Run one collaborator call on its own task so a panic becomes an error of
/// that stage. The task is aborted if the caller is dropped.
async fn isolate<T, F>(work: F) -> Result<T, WeatherError>
where
    F: Future<Output = Result<T, WeatherError>> + Send + 'static,
    T: Send + 'static,
{
    match AbortOnDropHandle::new(tokio::spawn(work)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Collaborator task failed: {}", e);
            Err(WeatherError::TaskFailed(e.to_string()))
        }
    }
}

/// Owns the published forecast state and display name.
#[derive(Clone)]
pub struct ForecastCoordinator {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl std::fmt::Debug for ForecastCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastCoordinator")
            .field("generation", &self.generation())
            .field("placeholder_name", &self.shared.placeholder_name)
            .finish_non_exhaustive()
    }
}

impl ForecastCoordinator {
    /// Create a coordinator bound to the current tokio runtime.
    ///
    /// # Errors
    /// Returns `WeatherError::NotInitialized` when called outside a runtime.
    pub fn new(
        api: Arc<dyn ForecastApi>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Result<Self, WeatherError> {
        Self::with_placeholder_name(api, geocoder, DEFAULT_PLACEHOLDER_NAME)
    }

    /// Create a coordinator that shows `placeholder_name` when reverse
    /// geocoding yields nothing.
    ///
    /// # Errors
    /// Returns `WeatherError::NotInitialized` when called outside a runtime.
    pub fn with_placeholder_name(
        api: Arc<dyn ForecastApi>,
        geocoder: Arc<dyn ReverseGeocoder>,
        placeholder_name: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        let runtime = Handle::try_current().map_err(|_| WeatherError::NotInitialized)?;
        let (state_tx, _) = watch::channel(ForecastState::Idle);
        let (name_tx, _) = watch::channel(String::new());

        Ok(Self {
            shared: Arc::new(Shared {
                api,
                geocoder,
                placeholder_name: placeholder_name.into(),
                active: Mutex::new(ActiveGeneration {
                    generation: 0,
                    cancel: CancellationToken::new(),
                }),
                state_tx,
                name_tx,
            }),
            runtime,
        })
    }

    /// Reverse-geocode and fetch the forecast for a coordinate.
    ///
    /// `Loading` is published before this returns.
    pub fn fetch_by_coordinates(&self, coordinate: Coordinate) -> JoinHandle<()> {
        let (generation, cancel) = self.shared.begin(ForecastState::Loading);
        tracing::info!("Fetching weather for {} (generation {})", coordinate, generation);
        self.spawn_coordinates(generation, cancel, coordinate)
    }

    /// Search for a place by name, then fetch its forecast.
    ///
    /// Returns `None` without touching any state when the trimmed query is empty.
    pub fn fetch_by_query(&self, query: &str) -> Option<JoinHandle<()>> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("Ignoring empty location query");
            return None;
        }

        let (generation, cancel) = self.shared.begin(ForecastState::Loading);
        tracing::info!("Searching for '{}' (generation {})", query, generation);
        let shared = self.shared.clone();
        let sequence = shared.query_sequence(generation, query.to_string());
        Some(self.spawn_sequence(generation, cancel, sequence))
    }

    /// Publish an error raised before any network call, e.g. a denied
    /// permission. The message is shown as-is.
    pub fn report_external_error(&self, message: impl Into<String>) -> Generation {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = UNSPECIFIED_ERROR_MESSAGE.to_string();
        }
        tracing::info!("External error: {}", message);
        let (generation, _) = self.shared.begin(ForecastState::Error(message));
        generation
    }

    /// Show loading feedback while an outside precondition resolves.
    pub fn mark_loading(&self) -> Generation {
        let (generation, _) = self.shared.begin(ForecastState::Loading);
        generation
    }

    /// Locate the device, then fetch the forecast for that position.
    ///
    /// A location failure is published through its user message. If another
    /// command starts while the lookup is pending, the lookup result is
    /// discarded.
    pub fn fetch_current_location(&self, provider: Arc<dyn LocationProvider>) -> JoinHandle<()> {
        let (generation, cancel) = self.shared.begin(ForecastState::Loading);
        let this = self.clone();

        self.runtime.spawn(async move {
            let located = tokio::select! {
                _ = cancel.cancelled() => return,
                located = provider.current_location() => located,
            };

            match located {
                Ok(coordinate) => {
                    let Some((next, next_cancel)) =
                        this.shared.begin_after(generation, ForecastState::Loading)
                    else {
                        return;
                    };
                    tracing::info!("Device located at {} (generation {})", coordinate, next);
                    let _ = this.spawn_coordinates(next, next_cancel, coordinate).await;
                }
                Err(e) => {
                    tracing::warn!("Device location unavailable: {}", e);
                    this.shared
                        .begin_after(generation, ForecastState::Error(e.user_message()));
                }
            }
        })
    }

    /// Cancel in-flight work.
    ///
    /// A pending `Loading` is replaced by `Idle`, so subscribers waiting for a
    /// terminal state should also stop waiting on `Idle`. Terminal states are
    /// left as they are.
    pub fn shutdown(&self) {
        let active = self.shared.active.lock();
        active.cancel.cancel();
        self.shared.state_tx.send_if_modified(|state| {
            if state.is_loading() {
                *state = ForecastState::Idle;
                true
            } else {
                false
            }
        });
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ForecastState> {
        self.shared.state_tx.subscribe()
    }

    pub fn subscribe_location_name(&self) -> watch::Receiver<String> {
        self.shared.name_tx.subscribe()
    }

    /// Snapshot of the current result state
    pub fn state(&self) -> ForecastState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn location_name(&self) -> String {
        self.shared.name_tx.borrow().clone()
    }

    pub fn generation(&self) -> Generation {
        self.shared.active.lock().generation
    }

    fn spawn_coordinates(
        &self,
        generation: Generation,
        cancel: CancellationToken,
        coordinate: Coordinate,
    ) -> JoinHandle<()> {
        let sequence = self.shared.clone().coordinates_sequence(generation, coordinate);
        self.spawn_sequence(generation, cancel, sequence)
    }

    /// Run a fetch sequence and publish its single terminal state.
    fn spawn_sequence<F>(
        &self,
        generation: Generation,
        cancel: CancellationToken,
        sequence: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = Result<ForecastPayload, FetchFailure>> + Send + 'static,
    {
        let shared = self.shared.clone();
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            // Inner task so a panic surfaces as a JoinError instead of
            // leaving the state stuck at Loading.
            let mut work = runtime.spawn(sequence);

            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    work.abort();
                    tracing::debug!("Generation {} cancelled", generation);
                    return;
                }
                joined = &mut work => joined,
            };

            let state = match joined {
                Ok(Ok(payload)) => ForecastState::Success(payload),
                Ok(Err(failure)) => {
                    tracing::warn!(
                        "Weather fetch failed ({:?} stage, generation {}): {}",
                        failure.stage,
                        generation,
                        failure.source
                    );
                    ForecastState::Error(failure.stage.user_message().to_string())
                }
                Err(e) => {
                    tracing::error!("Weather fetch task failed (generation {}): {}", generation, e);
                    ForecastState::Error(FORECAST_FAILED_MESSAGE.to_string())
                }
            };

            shared.publish_state(generation, state);
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::types::LocationMatch;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl ForecastApi for Unreachable {
        async fn fetch_forecast(&self, _: Coordinate) -> Result<ForecastPayload, WeatherError> {
            Err(WeatherError::NotInitialized)
        }

        async fn search_location(&self, _: &str) -> Result<Vec<LocationMatch>, WeatherError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ReverseGeocoder for Unreachable {
        async fn reverse_geocode(&self, _: Coordinate) -> Result<Option<String>, WeatherError> {
            Ok(None)
        }
    }

    fn coordinator() -> ForecastCoordinator {
        ForecastCoordinator::new(Arc::new(Unreachable), Arc::new(Unreachable)).unwrap()
    }

    #[test]
    fn new_requires_runtime() {
        let result = ForecastCoordinator::new(Arc::new(Unreachable), Arc::new(Unreachable));
        assert!(matches!(result, Err(WeatherError::NotInitialized)));
    }

    #[test]
    fn stage_messages() {
        assert_eq!(Stage::Search.user_message(), "Failed to find location");
        assert_eq!(Stage::Forecast.user_message(), "Failed to load weather data");
    }

    #[tokio::test]
    async fn stale_generation_cannot_publish() {
        let c = coordinator();
        let first = c.mark_loading();
        let second = c.mark_loading();
        assert_eq!(second, first + 1);

        assert!(!c.shared.publish_state(first, ForecastState::Error("late".into())));
        assert!(!c.shared.publish_name(first, "Old Town".into()));
        assert_eq!(c.state(), ForecastState::Loading);
        assert_eq!(c.location_name(), "");

        assert!(c.shared.publish_name(second, "New Town".into()));
        assert_eq!(c.location_name(), "New Town");
    }

    #[tokio::test]
    async fn begin_cancels_previous_token() {
        let c = coordinator();
        let (_, first_token) = c.shared.begin(ForecastState::Loading);
        let (_, second_token) = c.shared.begin(ForecastState::Loading);
        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
    }

    #[tokio::test]
    async fn begin_after_requires_current_generation() {
        let c = coordinator();
        let first = c.mark_loading();
        assert!(c.shared.begin_after(first, ForecastState::Loading).is_some());
        // `first` is now stale
        assert!(c
            .shared
            .begin_after(first, ForecastState::Error("stale".into()))
            .is_none());
        assert_eq!(c.state(), ForecastState::Loading);
    }

    #[tokio::test]
    async fn empty_external_error_gets_a_message() {
        let c = coordinator();
        c.report_external_error("   ");
        assert_eq!(c.state().error(), Some(UNSPECIFIED_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn shutdown_cancels_active_generation() {
        let c = coordinator();
        let (generation, token) = c.shared.begin(ForecastState::Loading);
        c.shutdown();
        assert!(token.is_cancelled());
        assert_eq!(c.state(), ForecastState::Idle);

        // The generation is still current by number but no longer accepts results
        assert!(!c.shared.publish_state(generation, ForecastState::Error("late".into())));
        assert_eq!(c.state(), ForecastState::Idle);
    }

    #[tokio::test]
    async fn shutdown_keeps_terminal_state() {
        let c = coordinator();
        c.report_external_error("Location permission denied.");
        c.shutdown();
        assert_eq!(c.state().error(), Some("Location permission denied."));
    }
}
