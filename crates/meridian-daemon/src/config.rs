//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Oracle parameters.
    #[serde(default)]
    pub oracle: OracleSection,
    /// Accumulator gating parameters.
    #[serde(default)]
    pub accumulator: AccumulatorSection,
    /// Tokens the keeper drives, with their simulated starting market.
    #[serde(default)]
    pub tokens: Vec<TokenSection>,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedSection,
}

/// Oracle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSection {
    /// Seconds between published observations.
    #[serde(default = "default_period")]
    pub period: u64,
    /// Accumulation snapshots per observation window.
    #[serde(default = "default_granularity")]
    pub granularity: u16,
    /// Extra staleness allowed to an upstream beyond its heartbeat.
    #[serde(default = "default_grace")]
    pub grace: u64,
    /// Decimal precision of published prices.
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u8,
    /// Decimal precision of published liquidity.
    #[serde(default)]
    pub liquidity_decimals: u8,
    /// Quote token id, 40 hex characters.
    #[serde(default = "default_quote_token")]
    pub quote_token: String,
}

/// Accumulator gating parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulatorSection {
    /// Relative-change threshold at 1e8 scale (2% = 2000000). Held as a
    /// u64 because TOML integers are 64-bit; widened where it is used.
    #[serde(default = "default_update_threshold")]
    pub update_threshold: u64,
    /// Minimum seconds between threshold-driven snapshots.
    #[serde(default = "default_update_delay")]
    pub update_delay: u64,
    /// Maximum seconds between snapshots.
    #[serde(default = "default_heartbeat")]
    pub heartbeat: u64,
}

/// One token the keeper drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSection {
    /// Token id, 40 hex characters.
    pub id: String,
    /// Display symbol for logs.
    #[serde(default)]
    pub symbol: String,
    /// Simulated starting price in quote units at the oracle's price
    /// decimals.
    pub start_price: u64,
    /// Simulated token-side liquidity.
    #[serde(default = "default_liquidity")]
    pub token_liquidity: u64,
    /// Simulated quote-side liquidity.
    #[serde(default = "default_liquidity")]
    pub quote_token_liquidity: u64,
}

/// Advanced settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSection {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_period() -> u64 {
    60
}

fn default_granularity() -> u16 {
    2
}

fn default_grace() -> u64 {
    3600
}

fn default_price_decimals() -> u8 {
    8
}

fn default_quote_token() -> String {
    "ffffffffffffffffffffffffffffffffffffffff".to_string()
}

fn default_update_threshold() -> u64 {
    2_000_000
}

fn default_update_delay() -> u64 {
    10
}

fn default_heartbeat() -> u64 {
    300
}

fn default_liquidity() -> u64 {
    1_000_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            period: default_period(),
            granularity: default_granularity(),
            grace: default_grace(),
            price_decimals: default_price_decimals(),
            liquidity_decimals: 0,
            quote_token: default_quote_token(),
        }
    }
}

impl Default for AccumulatorSection {
    fn default() -> Self {
        Self {
            update_threshold: default_update_threshold(),
            update_delay: default_update_delay(),
            heartbeat: default_heartbeat(),
        }
    }
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Config file path: the `MERIDIAN_CONFIG` env var, or `meridian.toml`
    /// in the working directory.
    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("MERIDIAN_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from("meridian.toml")
    }
}
