//! Earnings Export Script
//!
//! Fires a marker pair on every bar dated on an earnings announcement and
//! labels it with the announcement timing and the reported/estimated figures.

mod config;
mod script;

pub use config::EarningsScriptConfig;
pub use script::EarningsScript;

use crate::scripts::MarkerScript;
use crate::Config;
use anyhow::Result;

pub const NAME: &str = "earnings";

/// Create script from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn MarkerScript>> {
    let script_config: EarningsScriptConfig = serde_json::from_value(config.script.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse earnings config: {}", e))?;
    Ok(Box::new(EarningsScript::new(script_config)))
}
