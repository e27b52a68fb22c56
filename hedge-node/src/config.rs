use anyhow::{Context, Result};
use hedge_types::{ContractAddresses, CurrencyCode, Network, ProtectionLimits, CURRENCIES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;
use tracing::Level;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    pub network: Network,
    pub listen_addr: SocketAddr,
    pub refresh_interval_secs: u64,
    /// Price service base URL. Without one the node runs on simulated rates.
    pub oracle_url: Option<String>,
    pub log_level: String,
    pub limits: ProtectionLimits,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            refresh_interval_secs: 300,
            oracle_url: None,
            log_level: "info".to_string(),
            limits: ProtectionLimits::default(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: NodeConfig =
            serde_json::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        anyhow::ensure!(self.refresh_interval_secs > 0, "refresh_interval_secs must be positive");
        anyhow::ensure!(
            self.limits.min_percentage <= self.limits.default_percentage
                && self.limits.default_percentage <= self.limits.max_percentage,
            "default_percentage must lie within the percentage bounds"
        );
        anyhow::ensure!(
            self.limits.min_threshold <= self.limits.default_threshold
                && self.limits.default_threshold <= self.limits.max_threshold,
            "default_threshold must lie within the threshold bounds"
        );
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| anyhow::anyhow!("unknown log level '{}'", self.log_level))
    }

    pub fn contracts(&self) -> ContractAddresses {
        ContractAddresses::for_network(self.network)
    }

    pub fn supported_currencies(&self) -> BTreeSet<CurrencyCode> {
        CURRENCIES
            .iter()
            .filter(|c| c.supported)
            .map(|c| CurrencyCode::new(c.code))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let config: NodeConfig =
            serde_json::from_str(r#"{"network": "mainnet", "limits": {"cooldown_days": 3}}"#).unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.refresh_interval_secs, 300);
        assert_eq!(config.limits.cooldown_days, 3);
        assert_eq!(config.limits.max_percentage, 50);
        assert!(config.check().is_ok());
        assert!(config.contracts().rpc_url.contains("mainnet"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = NodeConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.check().is_err());

        let mut config = NodeConfig::default();
        config.refresh_interval_secs = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn all_known_currencies_are_supported() {
        assert_eq!(NodeConfig::default().supported_currencies().len(), 6);
    }
}
