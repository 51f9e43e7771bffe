#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod mcp;
mod overlay;
pub mod payment;
pub mod server;
pub mod services;
pub mod telemetry;

use serde::Deserialize;

pub use env::{expand_env, expand_with};
pub use mcp::*;
pub use overlay::{ENV_PREFIX, apply_env_overrides};
pub use payment::*;
pub use server::*;
pub use services::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Tollgate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// MCP endpoint configuration
    #[serde(default)]
    pub mcp: McpConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// x402 payment gating
    #[serde(default)]
    pub payment: Option<PaymentConfig>,
    /// Wrapped upstream services
    #[serde(default)]
    pub services: ServicesConfig,
}
