use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tollgate_config::{WeatherConfig, WeatherUnits};
use tollgate_core::{Result, RetryPolicy, ServiceError, json_body, retry_with_backoff, send_error};
use url::Url;

use crate::types::{CurrentRequest, ForecastEntry, ForecastRequest, ForecastResponse, WeatherData, upstream};

pub(crate) const SERVICE: &str = "weather";

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Forecast slots per day (the upstream reports every three hours)
const SLOTS_PER_DAY: u32 = 8;

/// Client for the OpenWeatherMap 2.5 API
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    units: WeatherUnits,
    timeout: Duration,
    retry: RetryPolicy,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::Config("API key required for OpenWeatherMap".to_string()))?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| ServiceError::Config(e.to_string()))?,
        };

        Ok(Self {
            http: tollgate_core::http_client(),
            base_url,
            api_key,
            units: config.units,
            timeout: config.timeout(),
            retry: RetryPolicy::default(),
        })
    }

    /// Current conditions
    pub async fn current(&self, request: &CurrentRequest) -> Result<WeatherData> {
        let url = self.endpoint("weather", &request.city, None)?;
        let current: upstream::Current = self.get_json(&url).await?;

        Ok(WeatherData {
            location: current.name,
            country: current.sys.and_then(|sys| sys.country),
            temperature: current.main.temp,
            feels_like: current.main.feels_like,
            humidity: current.main.humidity,
            pressure: current.main.pressure,
            description: first_description(current.weather),
            wind_speed: current.wind.map_or(0.0, |wind| wind.speed),
            units: self.units.as_str().to_string(),
        })
    }

    /// Three-hourly forecast covering `days` days
    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let url = self.endpoint("forecast", &request.city, Some(request.days * SLOTS_PER_DAY))?;
        let forecast: upstream::Forecast = self.get_json(&url).await?;

        let entries = forecast
            .list
            .into_iter()
            .map(|slot| ForecastEntry {
                time: slot.dt,
                temperature: slot.main.temp,
                description: first_description(slot.weather),
                pop: slot.pop,
            })
            .collect();

        Ok(ForecastResponse {
            location: forecast.city.name,
            entries,
        })
    }

    fn endpoint(&self, operation: &str, city: &str, count: Option<u32>) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| ServiceError::Config(format!("invalid weather base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["data", "2.5", operation]);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("q", city.trim())
                .append_pair("units", self.units.as_str())
                .append_pair("appid", self.api_key.expose_secret());

            if let Some(count) = count {
                query.append_pair("cnt", &count.to_string());
            }
        }

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        retry_with_backoff(self.retry, move || async move {
            // the query string carries the API key
            tracing::debug!(path = url.path(), "calling openweathermap");

            let response = self
                .http
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| send_error(SERVICE, &e.without_url()))?;

            json_body(SERVICE, response).await
        })
        .await
    }
}

fn first_description(conditions: Vec<upstream::Condition>) -> String {
    conditions
        .into_iter()
        .next()
        .map(|condition| condition.description)
        .unwrap_or_default()
}
