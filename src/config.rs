//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. The `script`
//! section is kept as raw JSON; each script parses its own parameters from it.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::aggregation::AggregationPeriod;
use crate::export::ExportFormat;
use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Script name plus script-specific parameters
    pub script: serde_json::Value,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Registry name from `script.name`
    pub fn script_name(&self) -> Result<String> {
        self.script
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .context("'name' is required in the 'script' section of config. Example: \"script\": { \"name\": \"ohlc\", ... }")
    }

    /// Set the script name, keeping the other script parameters
    pub fn set_script_name(&mut self, name: &str) {
        if !self.script.is_object() {
            self.script = serde_json::json!({});
        }
        if let Some(obj) = self.script.as_object_mut() {
            obj.insert("name".to_string(), serde_json::json!(name));
        }
    }

    pub fn period(&self) -> Result<AggregationPeriod> {
        self.market
            .timeframe
            .parse()
            .with_context(|| format!("Invalid market.timeframe '{}'", self.market.timeframe))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.market
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid market.timezone '{}': {}", self.market.timezone, e))
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.data.symbols.iter().map(Symbol::new).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            script: serde_json::json!({ "name": "ohlc" }),
            market: MarketConfig::default(),
            data: DataConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Market configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Bar aggregation period, e.g. "1m", "5m", "1h", "1d"
    pub timeframe: String,
    /// IANA name of the exchange time zone
    pub timezone: String,
    /// Earnings calendar CSV, needed by the earnings script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings_file: Option<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            timeframe: "1m".to_string(),
            timezone: "America/New_York".to_string(),
            earnings_file: None,
        }
    }
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir: String,
    pub symbols: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: "data".to_string(),
            symbols: vec!["AAPL".to_string()],
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_dir: String,
    #[serde(default)]
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            output_dir: "results".to_string(),
            format: ExportFormat::Csv,
        }
    }
}
