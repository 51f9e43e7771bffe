//! Current weather and forecasts from OpenWeatherMap

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;
use tollgate_config::WeatherConfig;
use tollgate_core::{Result, ServiceError, ToolService, ToolSpec, ValidatedJson, to_value, validate::parse_arguments};

pub use client::WeatherClient;
pub use types::{CurrentRequest, ForecastEntry, ForecastRequest, ForecastResponse, WeatherData};

pub fn build_service(config: &WeatherConfig) -> anyhow::Result<Arc<WeatherClient>> {
    let client = WeatherClient::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize weather service: {e}"))?;
    Ok(Arc::new(client))
}

/// Create the endpoint router for weather
pub fn endpoint_router() -> Router<Arc<WeatherClient>> {
    Router::new()
        .route("/api/weather/current", post(current))
        .route("/api/weather/forecast", post(forecast))
}

async fn current(
    State(client): State<Arc<WeatherClient>>,
    ValidatedJson(request): ValidatedJson<CurrentRequest>,
) -> Result<Json<WeatherData>> {
    Ok(Json(client.current(&request).await?))
}

async fn forecast(
    State(client): State<Arc<WeatherClient>>,
    ValidatedJson(request): ValidatedJson<ForecastRequest>,
) -> Result<Json<ForecastResponse>> {
    Ok(Json(client.forecast(&request).await?))
}

#[async_trait]
impl ToolService for WeatherClient {
    fn name(&self) -> &str {
        client::SERVICE
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new::<CurrentRequest>(
                "current",
                "Get current weather conditions for a city: temperature, humidity, pressure, wind and a description.",
            ),
            ToolSpec::new::<ForecastRequest>(
                "forecast",
                "Get a three-hourly weather forecast for a city covering 1 to 5 days.",
            ),
        ]
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        match tool {
            "current" => to_value(&self.current(&parse_arguments(arguments)?).await?),
            "forecast" => to_value(&self.forecast(&parse_arguments(arguments)?).await?),
            other => Err(ServiceError::UnknownTool(other.to_string())),
        }
    }
}
