//! Plain-text rendering of the published forecast state.

use std::fmt::Write;

use skycast_weather::{weather_status, ForecastPayload, ForecastState};

const DATE_FORMAT: &str = "%A, %B %d, %H:%M";

/// Render `state` for the terminal. `location_name` heads a successful result.
pub fn render_state(location_name: &str, state: &ForecastState) -> String {
    match state {
        ForecastState::Idle => String::new(),
        ForecastState::Loading => "Fetching weather...".to_string(),
        ForecastState::Success(payload) => render_details(location_name, payload),
        ForecastState::Error(message) => message.clone(),
    }
}

fn render_details(location_name: &str, payload: &ForecastPayload) -> String {
    let current = &payload.current;
    let observed = payload
        .observed_at()
        .map(|t| t.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| current.time.clone());

    let mut out = String::new();
    let _ = writeln!(out, "{}", location_name);
    let _ = writeln!(out, "{}", observed);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:.1}°C", current.temperature_2m);
    // No apparent-temperature field is requested
    let _ = writeln!(out, "Feels like: {:.1}°C", current.temperature_2m);
    let _ = writeln!(out, "{}", weather_status(current.weather_code));

    if let (Some(high), Some(low)) = (
        payload.daily.temperature_2m_max.first(),
        payload.daily.temperature_2m_min.first(),
    ) {
        let _ = writeln!(out, "High {:.1}°C / Low {:.1}°C", high, low);
    }

    let _ = writeln!(out);
    if let Some(humidity) = payload.current_humidity() {
        let _ = writeln!(out, "{:<10}{:.0}%", "Humidity", humidity);
    }
    let _ = writeln!(out, "{:<10}{:.1} km/h", "Wind", current.wind_speed_10m);
    if let Some(pressure) = payload.current_pressure() {
        let _ = writeln!(out, "{:<10}{:.1} hPa", "Pressure", pressure);
    }

    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const LA_FORECAST: &str =
        include_str!("../../skycast-weather/tests/fixtures/los_angeles_forecast.json");

    fn la_payload() -> ForecastPayload {
        serde_json::from_str(LA_FORECAST).unwrap()
    }

    #[test]
    fn test_render_success() {
        let text = render_state("Los Angeles, US", &ForecastState::Success(la_payload()));

        assert!(text.starts_with("Los Angeles, US\n"));
        assert!(text.contains("Monday, March 20, 12:00"));
        assert!(text.contains("25.5°C"));
        assert!(text.contains("Feels like: 25.5°C"));
        assert!(text.contains("Mainly clear, partly cloudy, and overcast"));
        assert!(text.contains("High 28.0°C / Low 22.0°C"));
        assert!(text.contains("60%"));
        assert!(text.contains("1016.0 hPa"));
    }

    #[test]
    fn test_render_unparseable_time_falls_back_to_raw() {
        let mut payload = la_payload();
        payload.current.time = "soon".to_string();
        let text = render_state("Here", &ForecastState::Success(payload));
        assert!(text.contains("\nsoon\n"));
    }

    #[test]
    fn test_render_error_and_loading() {
        assert_eq!(
            render_state("", &ForecastState::Error("Failed to find location".into())),
            "Failed to find location"
        );
        assert_eq!(
            render_state("x", &ForecastState::Loading),
            "Fetching weather..."
        );
        assert!(render_state("x", &ForecastState::Idle).is_empty());
    }
}
