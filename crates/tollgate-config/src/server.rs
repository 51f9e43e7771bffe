use std::net::SocketAddr;

use serde::Deserialize;

/// Default bind address when neither the config nor the CLI sets one
pub const DEFAULT_LISTEN_ADDRESS: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8000);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Upper bound on any request body, including non-JSON routes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address.unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

const fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}
