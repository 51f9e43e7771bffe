use std::{fmt, str::FromStr};

use serde::Deserialize;
use url::Url;

/// Decimals of the USDC asset prices are settled in
pub const USDC_DECIMALS: u32 = 6;

/// x402 payment gating configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Address receiving payments (`0x` + 40 hex digits)
    #[serde(default)]
    pub pay_to: Option<String>,
    #[serde(default)]
    pub network: Network,
    /// Token contract override, defaults to USDC on the network
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default = "default_facilitator_url")]
    pub facilitator_url: Url,
    #[serde(default = "default_max_timeout_seconds")]
    pub max_timeout_seconds: u64,
    /// Externally visible origin used to build `resource` URLs
    #[serde(default)]
    pub public_base_url: Option<Url>,
    /// Priced routes, first match wins
    #[serde(default)]
    pub routes: Vec<PricedRoute>,
}

/// A path pattern and what it costs
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricedRoute {
    /// Exact path, or a prefix ending in `/*`
    pub path: String,
    pub price: Price,
    #[serde(default)]
    pub description: Option<String>,
}

/// Settlement network
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    BaseSepolia,
    Base,
}

impl Network {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseSepolia => "base-sepolia",
            Self::Base => "base",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A USD price held as USDC atomic units
///
/// Accepts `"$0.01"` or `"0.01"`; at most six decimals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Price {
    atomic: u128,
}

impl Price {
    /// Amount in the asset's smallest unit (`$0.01` is `10000`)
    pub const fn atomic_units(&self) -> u128 {
        self.atomic
    }
}

impl FromStr for Price {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let amount = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();

        if amount.is_empty() {
            return Err("price must not be empty".to_string());
        }

        if amount.starts_with('-') {
            return Err(format!("price must not be negative: `{input}`"));
        }

        let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));

        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) || (amount.contains('.') && fraction.is_empty())
        {
            return Err(format!("invalid price `{input}`, expected a USD amount like \"$0.01\""));
        }

        if fraction.len() > USDC_DECIMALS as usize {
            return Err(format!("price `{input}` has more than {USDC_DECIMALS} decimals"));
        }

        let scale = 10_u128.pow(USDC_DECIMALS);
        let overflow = || format!("price `{input}` is too large");

        let whole: u128 = whole.parse().map_err(|_| overflow())?;
        let fraction: u128 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<width$}", width = USDC_DECIMALS as usize);
            padded.parse().map_err(|_| overflow())?
        };

        let atomic = whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(overflow)?;

        if atomic == 0 {
            return Err(format!("price `{input}` must be greater than zero"));
        }

        Ok(Self { atomic })
    }
}

impl TryFrom<String> for Price {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10_u128.pow(USDC_DECIMALS);
        let fraction = format!("{:06}", self.atomic % scale);
        let fraction = fraction.trim_end_matches('0');

        if fraction.is_empty() {
            write!(f, "${}", self.atomic / scale)
        } else {
            write!(f, "${}.{fraction}", self.atomic / scale)
        }
    }
}

fn default_facilitator_url() -> Url {
    Url::parse("https://x402.org/facilitator").expect("must be valid URL")
}

const fn default_max_timeout_seconds() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atomic(input: &str) -> u128 {
        input.parse::<Price>().unwrap().atomic_units()
    }

    #[test]
    fn dollar_prefix_is_optional() {
        assert_eq!(atomic("$0.01"), 10_000);
        assert_eq!(atomic("0.01"), 10_000);
        assert_eq!(atomic(" $1 "), 1_000_000);
        assert_eq!(atomic("2.5"), 2_500_000);
        assert_eq!(atomic("$0.000001"), 1);
    }

    #[test]
    fn malformed_prices_are_rejected() {
        for input in ["", "$", "-0.01", "$-1", "abc", "0.1.2", ".5", "1.", "1e3", "$0.0000001", "0", "$0.00"] {
            assert!(input.parse::<Price>().is_err(), "expected `{input}` to be rejected");
        }
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!("$0.010".parse::<Price>().unwrap().to_string(), "$0.01");
        assert_eq!("3".parse::<Price>().unwrap().to_string(), "$3");
    }

    #[test]
    fn price_deserializes_from_string() {
        let route: PricedRoute = toml::from_str("path = \"/api/tavily/*\"\nprice = \"$0.02\"").unwrap();
        assert_eq!(route.price.atomic_units(), 20_000);

        let err = toml::from_str::<PricedRoute>("path = \"/x\"\nprice = \"$0.0000001\"").unwrap_err();
        assert!(err.to_string().contains("more than 6 decimals"));
    }

    #[test]
    fn network_names() {
        assert_eq!(Network::default().as_str(), "base-sepolia");
        let config: PaymentConfig = toml::from_str("network = \"base\"").unwrap();
        assert_eq!(config.network, Network::Base);
        assert_eq!(config.facilitator_url.as_str(), "https://x402.org/facilitator");
        assert_eq!(config.max_timeout_seconds, 60);
        assert!(!config.enabled);
    }
}
