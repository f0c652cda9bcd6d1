//! Session OHLC Export Script
//!
//! Fires a marker pair on every bar inside the trading session and labels the
//! open marker with the previous bar's OHLC and the current close.

mod config;
mod script;

pub use config::OhlcConfig;
pub use script::OhlcScript;

use crate::scripts::MarkerScript;
use crate::Config;
use anyhow::Result;

pub const NAME: &str = "ohlc";

/// Create script from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn MarkerScript>> {
    let script_config: OhlcConfig = serde_json::from_value(config.script.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse ohlc config: {}", e))?;
    Ok(Box::new(OhlcScript::new(script_config)))
}
