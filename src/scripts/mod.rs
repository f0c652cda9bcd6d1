//! Marker Scripts Module
//!
//! A marker script looks at one bar at a time and decides whether the bar gets
//! a marker pair, plus the label the open marker carries. Scripts are looked up
//! by name through a registry so new ones plug in without touching the engine.

pub mod earnings;
pub mod ohlc;

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};
use tracing::warn;

use crate::aggregation::AggregationPeriod;
use crate::earnings::EarningsCalendar;
use crate::history::BarHistory;
use crate::label::{format_label, LabelField};
use crate::{Bar, Color, Config, ScriptDeclaration, Symbol};

// =============================================================================
// Script Trait
// =============================================================================

/// Everything a script may read while evaluating one bar.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub symbol: &'a Symbol,
    pub bar: &'a Bar,
    /// Recent bars, `bar` included as offset 0
    pub history: &'a BarHistory,
    pub period: AggregationPeriod,
    pub timezone: Tz,
    pub earnings: Option<&'a EarningsCalendar>,
}

impl BarContext<'_> {
    /// Trading date of the bar.
    ///
    /// Intraday bars are dated in the exchange time zone. Daily and coarser
    /// bars are stamped at the start of their UTC date, which is their date.
    pub fn session_date(&self) -> NaiveDate {
        if self.period.is_daily_or_coarser() {
            self.bar.datetime.date_naive()
        } else {
            self.bar.datetime.with_timezone(&self.timezone).date_naive()
        }
    }
}

/// A script's verdict for one bar
#[derive(Debug, Clone, PartialEq)]
pub struct BarDecision {
    pub fire: bool,
    /// Computed on every bar, used only when `fire` is set
    pub label: String,
}

pub trait MarkerScript: Send + Sync {
    /// Registry name (matches the config's `script.name`)
    fn name(&self) -> &'static str;

    /// Host invocation contract
    fn declaration(&self) -> ScriptDeclaration {
        ScriptDeclaration::default()
    }

    /// How many earlier bars `evaluate` reads
    fn lookback(&self) -> usize {
        0
    }

    /// Display color for both markers of a pair
    fn color(&self) -> Color {
        Color::Black
    }

    /// Whether the script needs an earnings calendar
    fn requires_earnings(&self) -> bool {
        false
    }

    fn evaluate(&self, ctx: &BarContext) -> BarDecision;
}

/// Format a label, flagging fields that will corrupt downstream splitting.
pub fn render_label(symbol: &Symbol, fields: &[LabelField]) -> String {
    if fields.iter().any(LabelField::contains_delimiter) {
        warn!(symbol = %symbol, "Label field contains the '|' delimiter; downstream parsing will misalign");
    }
    format_label(fields)
}

// =============================================================================
// Script Registry
// =============================================================================

/// Factory function type for creating scripts from config
pub type ScriptFactory = fn(&Config) -> Result<Box<dyn MarkerScript>>;

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, ScriptFactory>>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<&'static str, ScriptFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(ohlc::NAME, ohlc::create as ScriptFactory);
        map.insert(earnings::NAME, earnings::create as ScriptFactory);
        RwLock::new(map)
    })
}

/// Create a script from configuration
pub fn create_script(config: &Config) -> Result<Box<dyn MarkerScript>> {
    let registry = get_registry().read().unwrap_or_else(|e| e.into_inner());

    let script_name = config.script_name()?;
    let factory = registry.get(script_name.as_str()).ok_or_else(|| {
        let mut available: Vec<_> = registry.keys().copied().collect();
        available.sort_unstable();
        anyhow::anyhow!(
            "Unknown script: '{}'. Available: {}",
            script_name,
            available.join(", ")
        )
    })?;

    factory(config)
}

/// Registered script names, sorted
pub fn available_scripts() -> Vec<&'static str> {
    let mut names: Vec<_> = get_registry()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .keys()
        .copied()
        .collect();
    names.sort_unstable();
    names
}

/// Register a new script (for plugins or testing)
pub fn register_script(name: &'static str, factory: ScriptFactory) {
    get_registry()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(name, factory);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scripts_registered() {
        let names = available_scripts();
        assert!(names.contains(&"ohlc"));
        assert!(names.contains(&"earnings"));
    }

    #[test]
    fn test_unknown_script_rejected() {
        let mut config = Config::default();
        config.set_script_name("macd");
        let err = create_script(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown script: 'macd'"));
    }

    #[test]
    fn test_create_from_default_config() {
        let script = create_script(&Config::default()).unwrap();
        assert_eq!(script.name(), "ohlc");
        assert_eq!(script.lookback(), 1);
    }
}
