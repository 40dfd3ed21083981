//! WMO weather interpretation codes mapped to display text and icons.

use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str =
    "https://raw.githubusercontent.com/visualcrossing/WeatherIcons/main/PNG/2nd%20Set%20-%20Color";

/// Weather condition groups as reported by the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    ClearSky,
    MainlyClear,
    Fog,
    Drizzle,
    FreezingDrizzle,
    Rain,
    FreezingRain,
    SnowFall,
    SnowGrains,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    ThunderstormWithHail,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1..=3 => Self::MainlyClear,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 | 63 | 65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71 | 73 | 75 => Self::SnowFall,
            77 => Self::SnowGrains,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "Clear sky",
            Self::MainlyClear => "Mainly clear, partly cloudy, and overcast",
            Self::Fog => "Fog and depositing rime fog",
            Self::Drizzle => "Drizzle: Light, moderate, and dense intensity",
            Self::FreezingDrizzle => "Freezing Drizzle: Light and dense intensity",
            Self::Rain => "Rain: Slight, moderate and heavy intensity",
            Self::FreezingRain => "Freezing Rain: Light and heavy intensity",
            Self::SnowFall => "Snow fall: Slight, moderate, and heavy intensity",
            Self::SnowGrains => "Snow grains",
            Self::RainShowers => "Rain showers: Slight, moderate, and violent",
            Self::SnowShowers => "Snow showers slight and heavy",
            Self::Thunderstorm => "Thunderstorm: Slight or moderate",
            Self::ThunderstormWithHail => "Thunderstorm with slight and heavy hail",
            Self::Unknown => "Unknown",
        }
    }

    /// Icon file name within the icon set. Unknown codes show a clear day.
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::ClearSky | Self::Unknown => "clear-day",
            Self::MainlyClear => "partly-cloudy-day",
            Self::Fog => "fog",
            Self::Drizzle => "drizzle",
            Self::FreezingDrizzle | Self::FreezingRain => "sleet",
            Self::Rain => "rain",
            Self::SnowFall | Self::SnowGrains | Self::SnowShowers => "snow",
            Self::RainShowers => "showers-day",
            Self::Thunderstorm | Self::ThunderstormWithHail => "thunderstorm",
        }
    }

    pub fn icon_url(&self) -> String {
        format!("{}/{}.png", ICON_BASE_URL, self.icon_name())
    }
}

/// Display status for a raw WMO code
pub fn weather_status(code: i32) -> &'static str {
    WeatherCondition::from_wmo_code(code).description()
}
