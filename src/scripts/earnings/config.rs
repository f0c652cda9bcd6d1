//! Earnings Export Configuration

use serde::{Deserialize, Serialize};

use crate::Color;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarningsScriptConfig {
    /// Marker color (default: black)
    #[serde(default)]
    pub color: Color,
}
