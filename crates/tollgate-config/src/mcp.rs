use serde::Deserialize;

/// MCP endpoint configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Mount path of the streamable HTTP transport
    #[serde(default = "default_path")]
    pub path: String,
    /// Instructions advertised to clients during initialization
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_sse_keep_alive_secs")]
    pub sse_keep_alive_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_path(),
            instructions: None,
            sse_keep_alive_secs: default_sse_keep_alive_secs(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

fn default_path() -> String {
    "/mcp".to_string()
}

const fn default_sse_keep_alive_secs() -> u64 {
    15
}
