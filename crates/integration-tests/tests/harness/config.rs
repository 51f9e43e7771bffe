//! Programmatic configuration builder for integration tests
//!
//! Builds TOML text and runs it through the regular loader, so tests see
//! the same defaults and validation as the binary.

use std::fmt::Write as _;

use tollgate_config::Config;

/// Address that receives payments in tests
pub const PAY_TO: &str = "0x1111111111111111111111111111111111111111";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    toml: String,
}

impl ConfigBuilder {
    /// Create a builder listening on an ephemeral local port
    pub fn new() -> Self {
        Self {
            toml: "[server]\nlisten_address = \"127.0.0.1:0\"\n".to_owned(),
        }
    }

    /// Enable Wikipedia against a mock upstream
    pub fn with_wikipedia(mut self, base_url: &str) -> Self {
        writeln!(self.toml, "[services.wikipedia]\nbase_url = \"{base_url}\"\ntimeout_secs = 5").unwrap();
        self
    }

    /// Enable weather against a mock upstream
    pub fn with_weather(mut self, base_url: &str) -> Self {
        writeln!(
            self.toml,
            "[services.weather]\napi_key = \"test-key\"\nbase_url = \"{base_url}\"\ntimeout_secs = 5"
        )
        .unwrap();
        self
    }

    /// Require payment for `routes` (`(path, price)`), settled by a mock facilitator
    pub fn with_payment(mut self, facilitator_url: &str, routes: &[(&str, &str)]) -> Self {
        writeln!(
            self.toml,
            "[payment]\nenabled = true\npay_to = \"{PAY_TO}\"\nfacilitator_url = \"{facilitator_url}\""
        )
        .unwrap();

        for (path, price) in routes {
            writeln!(self.toml, "[[payment.routes]]\npath = \"{path}\"\nprice = \"{price}\"").unwrap();
        }

        self
    }

    /// Disable the MCP endpoint
    pub fn without_mcp(mut self) -> Self {
        writeln!(self.toml, "[mcp]\nenabled = false").unwrap();
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        Config::from_toml_str(&self.toml, Vec::new()).expect("test config must be valid")
    }
}
