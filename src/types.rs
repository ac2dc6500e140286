use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Header overrides applied on top of the baseline request headers.
///
/// A name mapped to an empty list (or to a list whose first value is empty)
/// removes that header from the outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSet(pub BTreeMap<String, Vec<String>>);
impl HeaderSet {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }
    pub fn with(mut self, k: &str, v: &str) -> Self {
        self.0.insert(k.to_string(), vec![v.to_string()]);
        self
    }
    pub fn without(mut self, k: &str) -> Self {
        self.0.insert(k.to_string(), Vec::new());
        self
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub global_ping: GlobalPingConfig,
}

/// Resolution results kept between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Probe locations per provider, as of the last `cache` run.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locations: BTreeMap<String, Vec<String>>,
    /// Edge IPs collected for all image hostnames.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolves: Vec<IpAddr>,
}

/// On-disk configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_set_builders() {
        let hs = HeaderSet::empty().with("Referer", "https://example.com/").without("Accept");
        assert_eq!(hs.0.get("Referer"), Some(&vec!["https://example.com/".to_string()]));
        assert_eq!(hs.0.get("Accept"), Some(&Vec::new()));
        assert!(!hs.is_empty());
    }

    #[test]
    fn empty_config_document_parses() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn config_round_trips_resolves() {
        let mut cfg = Config::default();
        cfg.cache.resolves = vec!["1.2.3.4".parse().unwrap(), "::1".parse().unwrap()];
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"1.2.3.4\""));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
