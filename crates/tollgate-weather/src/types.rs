use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, Validate, validate};

/// Current conditions for a city
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CurrentRequest {
    /// City name, optionally with country code (`Paris,FR`)
    pub city: String,
}

impl Validate for CurrentRequest {
    fn validate(&self) -> Result<()> {
        validate::length("city", &self.city, 1, 100)
    }
}

/// Three-hourly forecast for a city
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ForecastRequest {
    /// City name, optionally with country code (`Paris,FR`)
    pub city: String,
    /// Days ahead (1-5)
    #[serde(default = "default_days")]
    pub days: u32,
}

impl Validate for ForecastRequest {
    fn validate(&self) -> Result<()> {
        validate::length("city", &self.city, 1, 100)?;
        validate::range("days", self.days, 1, 5)
    }
}

const fn default_days() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherData {
    pub location: String,
    pub country: Option<String>,
    pub temperature: f64,
    pub feels_like: f64,
    /// Relative humidity in percent
    pub humidity: u32,
    /// Sea level pressure in hPa
    pub pressure: u32,
    pub description: String,
    pub wind_speed: f64,
    /// `metric`, `imperial` or `standard`
    pub units: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub location: String,
    pub entries: Vec<ForecastEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Unix timestamp (seconds, UTC)
    pub time: i64,
    pub temperature: f64,
    pub description: String,
    /// Probability of precipitation (0-1)
    pub pop: f64,
}

/// OpenWeatherMap response shapes
pub(crate) mod upstream {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Current {
        pub name: String,
        #[serde(default)]
        pub sys: Option<Sys>,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Condition>,
        #[serde(default)]
        pub wind: Option<Wind>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Sys {
        #[serde(default)]
        pub country: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Main {
        pub temp: f64,
        #[serde(default)]
        pub feels_like: f64,
        #[serde(default)]
        pub humidity: u32,
        #[serde(default)]
        pub pressure: u32,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub description: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Wind {
        pub speed: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Forecast {
        pub city: City,
        #[serde(default)]
        pub list: Vec<Slot>,
    }

    #[derive(Debug, Deserialize)]
    pub struct City {
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Slot {
        pub dt: i64,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Condition>,
        #[serde(default)]
        pub pop: f64,
    }
}
