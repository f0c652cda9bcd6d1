//! Earnings calendar
//!
//! Per-symbol earnings announcement dates with the reported and consensus
//! figures. Loaded from CSV with columns `symbol,date,time,actual,estimated`;
//! a blank figure means the value is not known.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::Symbol;

/// When an announcement happens relative to the regular session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningTime {
    BeforeMarket,
    AfterMarket,
    DuringMarket,
    #[default]
    Unknown,
}

impl FromStr for EarningTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before_market" | "bmo" | "before" => Ok(EarningTime::BeforeMarket),
            "after_market" | "amc" | "after" => Ok(EarningTime::AfterMarket),
            "during_market" | "dmh" | "during" => Ok(EarningTime::DuringMarket),
            "" | "unknown" | "tns" => Ok(EarningTime::Unknown),
            other => anyhow::bail!("Unknown earnings time '{}'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub date: NaiveDate,
    pub time: EarningTime,
    pub actual: Option<f64>,
    pub estimated: Option<f64>,
}

impl EarningsEvent {
    pub fn is_before_market(&self) -> bool {
        self.time == EarningTime::BeforeMarket
    }

    pub fn is_after_market(&self) -> bool {
        self.time == EarningTime::AfterMarket
    }
}

#[derive(Debug, Deserialize)]
struct EarningsRow {
    symbol: String,
    date: NaiveDate,
    #[serde(default)]
    time: String,
    #[serde(default)]
    actual: Option<f64>,
    #[serde(default)]
    estimated: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct EarningsCalendar {
    events: HashMap<Symbol, BTreeMap<NaiveDate, EarningsEvent>>,
}

impl EarningsCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the calendar from a CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open earnings file {}", path.display()))?;

        let mut calendar = Self::new();
        for (row_idx, result) in reader.deserialize::<EarningsRow>().enumerate() {
            let row = result.with_context(|| format!("Failed to read earnings row {}", row_idx + 1))?;
            let time = row
                .time
                .parse::<EarningTime>()
                .with_context(|| format!("Bad earnings time on row {}", row_idx + 1))?;

            calendar.insert(
                Symbol::new(&row.symbol),
                EarningsEvent {
                    date: row.date,
                    time,
                    actual: row.actual,
                    estimated: row.estimated,
                },
            );
        }

        info!(
            "Loaded {} earnings events for {} symbols from {}",
            calendar.len(),
            calendar.events.len(),
            path.display()
        );
        Ok(calendar)
    }

    /// Add an event; a second event on the same date replaces the first.
    pub fn insert(&mut self, symbol: Symbol, event: EarningsEvent) {
        let by_date = self.events.entry(symbol.clone()).or_default();
        if by_date.insert(event.date, event).is_some() {
            debug!(symbol = %symbol, "Replaced duplicate earnings event");
        }
    }

    pub fn event(&self, symbol: &Symbol, date: NaiveDate) -> Option<&EarningsEvent> {
        self.events.get(symbol).and_then(|by_date| by_date.get(&date))
    }

    pub fn has_earnings(&self, symbol: &Symbol, date: NaiveDate) -> bool {
        self.event(symbol, date).is_some()
    }

    pub fn has_earnings_at(&self, symbol: &Symbol, date: NaiveDate, time: EarningTime) -> bool {
        self.event(symbol, date).is_some_and(|e| e.time == time)
    }

    /// Reported figure, NaN when unknown or no event
    pub fn actual_earnings(&self, symbol: &Symbol, date: NaiveDate) -> f64 {
        self.event(symbol, date)
            .and_then(|e| e.actual)
            .unwrap_or(f64::NAN)
    }

    /// Consensus figure, NaN when unknown or no event
    pub fn estimated_earnings(&self, symbol: &Symbol, date: NaiveDate) -> f64 {
        self.event(symbol, date)
            .and_then(|e| e.estimated)
            .unwrap_or(f64::NAN)
    }

    pub fn events_for(&self, symbol: &Symbol) -> impl Iterator<Item = &EarningsEvent> {
        self.events.get(symbol).into_iter().flat_map(|m| m.values())
    }

    pub fn len(&self) -> usize {
        self.events.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_earning_time_parse() {
        assert_eq!("bmo".parse::<EarningTime>().unwrap(), EarningTime::BeforeMarket);
        assert_eq!("After_Market".parse::<EarningTime>().unwrap(), EarningTime::AfterMarket);
        assert_eq!("".parse::<EarningTime>().unwrap(), EarningTime::Unknown);
        assert!("lunchtime".parse::<EarningTime>().is_err());
    }

    #[test]
    fn test_lookups() {
        let mut calendar = EarningsCalendar::new();
        let xyz = Symbol::new("XYZ");
        calendar.insert(
            xyz.clone(),
            EarningsEvent {
                date: date(2024, 1, 25),
                time: EarningTime::BeforeMarket,
                actual: None,
                estimated: Some(1.25),
            },
        );

        assert!(calendar.has_earnings(&xyz, date(2024, 1, 25)));
        assert!(!calendar.has_earnings(&xyz, date(2024, 1, 26)));
        assert!(!calendar.has_earnings(&Symbol::new("ABC"), date(2024, 1, 25)));
        assert!(calendar.has_earnings_at(&xyz, date(2024, 1, 25), EarningTime::BeforeMarket));
        assert!(!calendar.has_earnings_at(&xyz, date(2024, 1, 25), EarningTime::AfterMarket));
        assert!(calendar.actual_earnings(&xyz, date(2024, 1, 25)).is_nan());
        assert_eq!(calendar.estimated_earnings(&xyz, date(2024, 1, 25)), 1.25);
    }

    #[test]
    fn test_load_csv_with_blank_figures() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "symbol,date,time,actual,estimated").unwrap();
        writeln!(file, "XYZ,2024-01-25,amc,,12.3").unwrap();
        writeln!(file, "XYZ,2024-04-25,bmo,1.5,1.4").unwrap();
        writeln!(file, "ABC,2024-02-01,,,").unwrap();

        let calendar = EarningsCalendar::load_csv(file.path()).unwrap();
        assert_eq!(calendar.len(), 3);

        let xyz = Symbol::new("XYZ");
        let event = calendar.event(&xyz, date(2024, 1, 25)).unwrap();
        assert!(event.is_after_market());
        assert_eq!(event.actual, None);
        assert_eq!(event.estimated, Some(12.3));
        assert_eq!(calendar.events_for(&xyz).count(), 2);

        let abc = calendar.event(&Symbol::new("ABC"), date(2024, 2, 1)).unwrap();
        assert_eq!(abc.time, EarningTime::Unknown);
    }

    #[test]
    fn test_load_csv_rejects_bad_time() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "symbol,date,time,actual,estimated").unwrap();
        writeln!(file, "XYZ,2024-01-25,noon,,").unwrap();
        assert!(EarningsCalendar::load_csv(file.path()).is_err());
    }
}
