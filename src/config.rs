use crate::basis::BasisPolicy;
use crate::exchanges;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown exchange '{name}', supported exchanges are: {}", exchanges::supported().join(", "))]
    UnknownExchange { name: String },
    #[error("invalid configuration for exchange '{name}'")]
    InvalidExchange {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Configuration for a single exchange account
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExchangeConfig {
    /// Exchange CSV export
    pub file: PathBuf,
    /// Historical prices used to value coin-coin trades
    #[serde(default)]
    pub prices: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Calendar year to file for
    pub year: i32,
    /// Filer name printed on Form 8949
    pub name: String,
    /// Whether to write a TurboTax import file
    #[serde(default)]
    pub txf: bool,
    #[serde(default)]
    pub basis: BasisPolicy,
    /// Social security number printed on Form 8949
    #[serde(default = "default_ssn")]
    pub ssn: String,
    #[serde(default = "default_output_name")]
    pub output_name: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Default price file for exchanges without their own
    #[serde(default)]
    pub prices: Option<PathBuf>,
    /// Everything else is keyed by exchange identifier
    #[serde(flatten)]
    exchanges: BTreeMap<String, serde_yaml::Value>,
}

fn default_ssn() -> String {
    "-".to_string()
}

fn default_output_name() -> String {
    "form8949".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Config {
    /// Read the config, resolving relative paths against the config file's directory
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config = Config::parse(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base_dir))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        let config: Config = serde_yaml::from_str(contents)?;
        // surface unknown exchanges up front rather than silently ignoring them
        config.exchanges()?;
        Ok(config)
    }

    fn relative_to(mut self, base_dir: &Path) -> Config {
        self.output_dir = base_dir.join(&self.output_dir);
        self.prices = self.prices.map(|p| base_dir.join(p));
        for value in self.exchanges.values_mut() {
            if let serde_yaml::Value::Mapping(mapping) = value {
                for key in ["file", "prices"] {
                    if let Some(serde_yaml::Value::String(path)) = mapping.get_mut(key) {
                        *path = base_dir.join(&*path).to_string_lossy().into_owned();
                    }
                }
            }
        }
        self
    }

    /// Configured exchanges in registry order, with the default price file applied
    pub fn exchanges(&self) -> Result<Vec<(&'static str, ExchangeConfig)>, ConfigError> {
        if let Some(name) = self
            .exchanges
            .keys()
            .find(|name| exchanges::lookup(name).is_none())
        {
            return Err(ConfigError::UnknownExchange { name: name.clone() });
        }

        let mut configured = Vec::new();
        for name in exchanges::supported() {
            let Some(value) = self.exchanges.get(name) else {
                continue;
            };
            let mut exchange: ExchangeConfig = serde_yaml::from_value(value.clone())
                .map_err(|source| ConfigError::InvalidExchange {
                    name: name.to_string(),
                    source,
                })?;
            if exchange.prices.is_none() {
                exchange.prices = self.prices.clone();
            }
            configured.push((name, exchange));
        }
        Ok(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
year: 2018
name: Satoshi Nakamoto
txf: true
prices: prices.csv
bittrex:
  file: bittrex.csv
gdax:
  file: fills.csv
  prices: gdax_prices.csv
"#;

    #[test]
    fn parses_settings_with_defaults() {
        let config = Config::parse(CONFIG).unwrap();
        assert_eq!(config.year, 2018);
        assert_eq!(config.name, "Satoshi Nakamoto");
        assert!(config.txf);
        assert_eq!(config.basis, BasisPolicy::Highest);
        assert_eq!(config.ssn, "-");
        assert_eq!(config.output_name, "form8949");
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn exchanges_in_registry_order_with_default_prices() {
        let config = Config::parse(CONFIG).unwrap();
        let exchanges = config.exchanges().unwrap();
        assert_eq!(
            exchanges,
            vec![
                (
                    "gdax",
                    ExchangeConfig {
                        file: PathBuf::from("fills.csv"),
                        prices: Some(PathBuf::from("gdax_prices.csv")),
                    }
                ),
                (
                    "bittrex",
                    ExchangeConfig {
                        file: PathBuf::from("bittrex.csv"),
                        prices: Some(PathBuf::from("prices.csv")),
                    }
                ),
            ]
        );
    }

    #[test]
    fn paths_relative_to_config_dir() {
        let config = Config::parse(CONFIG).unwrap().relative_to(Path::new("/tax"));
        assert_eq!(config.output_dir, PathBuf::from("/tax/output"));
        let exchanges = config.exchanges().unwrap();
        assert_eq!(exchanges[0].1.file, PathBuf::from("/tax/fills.csv"));
        assert_eq!(
            exchanges[1].1.prices,
            Some(PathBuf::from("/tax/prices.csv"))
        );
    }

    #[test]
    fn basis_policy_setting() {
        let config = Config::parse("year: 2018\nname: A\nbasis: fifo\n").unwrap();
        assert_eq!(config.basis, BasisPolicy::Fifo);
        assert!(config.exchanges().unwrap().is_empty());
    }

    #[test]
    fn unknown_exchange_rejected() {
        let err = Config::parse("year: 2018\nname: A\nmtgox:\n  file: a.csv\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("mtgox"), "{}", message);
        assert!(message.contains("gdax, coinbase, bittrex, poloniex"), "{}", message);
    }

    #[test]
    fn exchange_without_file_rejected() {
        let err = Config::parse("year: 2018\nname: A\ngdax:\n  prices: p.csv\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidExchange { .. })
        ));
    }

    #[test]
    fn missing_year_rejected() {
        assert!(Config::parse("name: A\n").is_err());
    }
}
