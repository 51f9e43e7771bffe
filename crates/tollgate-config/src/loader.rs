use std::{
    path::Path,
    sync::{LazyLock, OnceLock},
};

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::{Config, PaymentConfig};

static GLOBAL: OnceLock<Config> = OnceLock::new();

static PAY_TO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("must be valid regex"));

static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}(-[a-z]+)?$").expect("must be valid regex"));

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, applies
    /// `TOLLGATE_<SECTION>__<KEY>` overrides from the process environment,
    /// then deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw, std::env::vars())
    }

    /// Build configuration from TOML text and an explicit environment
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Config::load`], minus file access
    pub fn from_toml_str<I>(raw: &str, env: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: Vec<(String, String)> = env.into_iter().collect();

        let expanded = crate::env::expand_with(raw, |name| {
            env.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
        })
        .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let mut table: toml::Table = toml::from_str(&expanded).map_err(|e| parse_error(&expanded, &e))?;

        let applied = crate::overlay::apply_env_overrides(&mut table, env);
        if !applied.is_empty() {
            tracing::debug!(keys = ?applied, "applied environment overrides");
        }

        let merged = toml::to_string(&table).map_err(|e| anyhow::anyhow!("failed to merge config overrides: {e}"))?;
        let config: Self = toml::from_str(&merged).map_err(|e| parse_error(&merged, &e))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the process-wide configuration once
    ///
    /// The first successful call reads `path`; later calls return the same
    /// instance without touching the file again.
    ///
    /// # Errors
    ///
    /// Returns an error if the first load fails
    pub fn init_global(path: &Path) -> anyhow::Result<&'static Self> {
        if let Some(config) = GLOBAL.get() {
            return Ok(config);
        }

        let config = Self::load(path)?;

        Ok(GLOBAL.get_or_init(|| config))
    }

    /// The process-wide configuration, if it has been initialized
    pub fn global() -> Option<&'static Self> {
        GLOBAL.get()
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or invalid field
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server()?;
        self.validate_services()?;

        if let Some(payment) = &self.payment {
            validate_payment(payment)?;
        }

        Ok(())
    }

    fn validate_server(&self) -> anyhow::Result<()> {
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be greater than 0");
        }

        if self.mcp.enabled && !self.mcp.path.starts_with('/') {
            anyhow::bail!("mcp.path must start with '/'");
        }

        if self.mcp.enabled && self.mcp.path.starts_with("/api/") {
            anyhow::bail!("mcp.path must not be under /api/");
        }

        Ok(())
    }

    fn validate_services(&self) -> anyhow::Result<()> {
        let services = &self.services;

        if let Some(wikipedia) = services.wikipedia()
            && !LANGUAGE.is_match(&wikipedia.language)
        {
            anyhow::bail!(
                "services.wikipedia.language must match {}, got '{}'",
                LANGUAGE.as_str(),
                wikipedia.language
            );
        }

        if let Some(tavily) = services.tavily() {
            require_secret("services.tavily.api_key", tavily.api_key.as_ref())?;
        }

        if let Some(weather) = services.weather() {
            require_secret("services.weather.api_key", weather.api_key.as_ref())?;
        }

        if let Some(tts) = services.tts() {
            let mut providers = 0;

            for (kind, provider) in tts.providers() {
                require_secret(
                    &format!("services.tts.{}.api_key", kind.as_str()),
                    provider.api_key.as_ref(),
                )?;
                providers += 1;
            }

            if providers == 0 {
                anyhow::bail!("services.tts requires at least one provider (elevenlabs or cartesia)");
            }

            if let Some(default) = tts.default_provider
                && !tts.providers().any(|(kind, _)| kind == default)
            {
                anyhow::bail!(
                    "services.tts.default_provider '{}' is not configured",
                    default.as_str()
                );
            }
        }

        if let Some(youtube) = services.youtube() {
            require_secret("services.youtube.api_key", youtube.api_key.as_ref())?;

            if youtube.cache_capacity == 0 {
                anyhow::bail!("services.youtube.cache_capacity must be greater than 0");
            }
        }

        for (field, secs) in services.timeouts() {
            if secs == 0 {
                anyhow::bail!("{field} must be greater than 0");
            }
        }

        if let Some(postgres) = services.postgres() {
            require_secret("services.postgres.url", postgres.url.as_ref())?;

            if postgres.max_connections == 0 {
                anyhow::bail!("services.postgres.max_connections must be greater than 0");
            }

            if postgres.max_rows == 0 {
                anyhow::bail!("services.postgres.max_rows must be greater than 0");
            }
        }

        Ok(())
    }
}

/// Describe a TOML error by location without echoing the offending value
///
/// The document may hold expanded secrets, so source snippets and the
/// values quoted in type errors are left out.
fn parse_error(doc: &str, error: &toml::de::Error) -> anyhow::Error {
    let message = redact_value(error.message());

    match error.span().and_then(|span| key_at(doc, span.start)) {
        Some(key) => anyhow::anyhow!("failed to parse config at {key}: {message}"),
        None => {
            let line = error
                .span()
                .map_or(0, |span| doc[..span.start.min(doc.len())].matches('\n').count() + 1);
            anyhow::anyhow!("failed to parse config at line {line}: {message}")
        }
    }
}

/// `invalid type: string "hunter2", expected u64` becomes
/// `invalid type: string, expected u64`
fn redact_value(message: &str) -> String {
    let Some((prefix, rest)) = ["invalid type: ", "invalid value: "]
        .into_iter()
        .find_map(|prefix| message.strip_prefix(prefix).map(|rest| (prefix, rest)))
    else {
        return message.to_string();
    };

    let (unexpected, expected) = rest.split_once(", expected ").unwrap_or((rest, "a different value"));
    let kind = unexpected.split_whitespace().next().unwrap_or("value");

    format!("{prefix}{kind}, expected {expected}")
}

/// Dotted key of the `key = value` line containing `offset`
fn key_at(doc: &str, offset: usize) -> Option<String> {
    let before = doc.get(..offset)?;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let (key, _) = doc[line_start..].lines().next()?.split_once('=')?;
    let key = key.trim();

    let section = doc[..line_start].lines().rev().find_map(|line| {
        let line = line.trim();
        line.starts_with('[').then(|| line.trim_matches(['[', ']']).trim())
    });

    Some(match section {
        Some(section) => format!("{section}.{key}"),
        None => key.to_string(),
    })
}

fn require_secret(field: &str, value: Option<&SecretString>) -> anyhow::Result<()> {
    match value {
        Some(secret) if !secret.expose_secret().trim().is_empty() => Ok(()),
        _ => anyhow::bail!("{field} is required when the service is enabled"),
    }
}

fn validate_payment(payment: &PaymentConfig) -> anyhow::Result<()> {
    if !payment.enabled {
        return Ok(());
    }

    match payment.pay_to.as_deref() {
        Some(address) if PAY_TO.is_match(address) => {}
        Some(address) => anyhow::bail!("payment.pay_to must be a 0x-prefixed 20-byte hex address, got '{address}'"),
        None => anyhow::bail!("payment.pay_to is required when payment is enabled"),
    }

    if let Some(asset) = payment.asset.as_deref()
        && !PAY_TO.is_match(asset)
    {
        anyhow::bail!("payment.asset must be a 0x-prefixed 20-byte hex address, got '{asset}'");
    }

    if payment.routes.is_empty() {
        anyhow::bail!("payment.routes must contain at least one priced route when payment is enabled");
    }

    for route in &payment.routes {
        if !route.path.starts_with('/') {
            anyhow::bail!("payment route path '{}' must start with '/'", route.path);
        }
    }

    if payment.max_timeout_seconds == 0 {
        anyhow::bail!("payment.max_timeout_seconds must be greater than 0");
    }

    Ok(())
}
