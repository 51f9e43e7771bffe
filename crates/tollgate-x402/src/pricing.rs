use tollgate_config::{Network, PricedRoute};

/// Token a network settles in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub address: &'static str,
    /// EIP-712 domain name
    pub name: &'static str,
    /// EIP-712 domain version
    pub version: &'static str,
}

/// USDC contract for a network
pub const fn usdc(network: Network) -> Asset {
    match network {
        Network::BaseSepolia => Asset {
            address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            name: "USDC",
            version: "2",
        },
        Network::Base => Asset {
            address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            name: "USD Coin",
            version: "2",
        },
    }
}

/// Ordered list of priced path patterns
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<PricedRoute>,
}

impl RouteTable {
    pub const fn new(routes: Vec<PricedRoute>) -> Self {
        Self { routes }
    }

    /// First route whose pattern matches `path`
    pub fn find(&self, path: &str) -> Option<&PricedRoute> {
        self.routes.iter().find(|route| matches(&route.path, path))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// `/a/b` matches only itself; `/a/*` matches `/a` and anything below it
fn matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => {
            path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
        }
        None => pattern == path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str, price: &str) -> PricedRoute {
        PricedRoute {
            path: path.to_string(),
            price: price.parse().unwrap(),
            description: None,
        }
    }

    #[test]
    fn exact_patterns_match_only_themselves() {
        let table = RouteTable::new(vec![route("/api/tavily/search", "0.01")]);

        assert!(table.find("/api/tavily/search").is_some());
        assert!(table.find("/api/tavily/search/more").is_none());
        assert!(table.find("/api/tavily").is_none());
    }

    #[test]
    fn wildcard_patterns_match_below_prefix() {
        let table = RouteTable::new(vec![route("/api/tavily/*", "0.01")]);

        assert!(table.find("/api/tavily/extract").is_some());
        assert!(table.find("/api/tavily").is_some());
        assert!(table.find("/api/tavilyx/search").is_none());
        assert!(table.find("/api/health").is_none());
    }

    #[test]
    fn first_match_wins() {
        let table = RouteTable::new(vec![route("/api/tts/voices", "0.001"), route("/api/tts/*", "0.05")]);

        assert_eq!(table.find("/api/tts/voices").unwrap().price.atomic_units(), 1_000);
        assert_eq!(table.find("/api/tts/synthesize").unwrap().price.atomic_units(), 50_000);
    }

    #[test]
    fn usdc_per_network() {
        assert_eq!(usdc(Network::Base).name, "USD Coin");
        assert_eq!(usdc(Network::BaseSepolia).address, "0x036CbD53842c5426634e7929541eC2318f3dCF7e");
    }
}
