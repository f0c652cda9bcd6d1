//! Marker label formatting
//!
//! A label is the only data channel out of a marker script: a fixed, ordered
//! list of fields joined with `|`. Downstream consumers split on the delimiter,
//! so field order is part of the contract and the delimiter is never escaped.
//!
//! Numbers use one canonical rule: the shortest decimal that round-trips the
//! `f64`, without trailing zeros or exponent (`100`, `104.5`, `-1`). `NaN`
//! prints as `NaN`. Flags print as `1` / `0`.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::earnings::EarningsEvent;
use crate::history::BarHistory;
use crate::Symbol;

pub const DELIMITER: char = '|';

/// Tag leading every OHLC export label
pub const OHLC_TAG: &str = "SOHLCP";

/// Stand-in for a missing earnings figure
pub const MISSING_SENTINEL: f64 = -1.0;

/// Name carried by every close marker
pub const CLOSE_MARKER_NAME: &str = "SellClose";

/// One field of a label
#[derive(Debug, Clone, PartialEq)]
pub enum LabelField {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl LabelField {
    /// Whether the rendered field would split into more than one field downstream.
    pub fn contains_delimiter(&self) -> bool {
        matches!(self, LabelField::Text(s) if s.contains(DELIMITER))
    }
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelField::Text(s) => f.write_str(s),
            LabelField::Number(n) => write!(f, "{}", format_number(*n)),
            LabelField::Flag(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

impl From<&str> for LabelField {
    fn from(s: &str) -> Self {
        LabelField::Text(s.to_string())
    }
}

impl From<String> for LabelField {
    fn from(s: String) -> Self {
        LabelField::Text(s)
    }
}

impl From<&Symbol> for LabelField {
    fn from(s: &Symbol) -> Self {
        LabelField::Text(s.as_str().to_string())
    }
}

impl From<f64> for LabelField {
    fn from(n: f64) -> Self {
        LabelField::Number(n)
    }
}

impl From<bool> for LabelField {
    fn from(b: bool) -> Self {
        LabelField::Flag(b)
    }
}

/// Canonical numeric-to-string rule.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Collapse -0 so it never leaks into labels.
        return "0".to_string();
    }
    value.to_string()
}

/// Join fields with the label delimiter, in the order given.
pub fn format_label(fields: &[LabelField]) -> String {
    fields.iter().join(&DELIMITER.to_string())
}

/// Replace a missing (NaN) earnings figure with the sentinel.
pub fn or_sentinel(value: f64) -> f64 {
    if value.is_nan() {
        MISSING_SENTINEL
    } else {
        value
    }
}

/// `SOHLCP|symbol|prev_open|prev_high|prev_low|prev_close|close`
///
/// Without a previous bar the four previous-bar fields are `NaN`.
pub fn ohlc_fields(symbol: &Symbol, history: &BarHistory) -> Vec<LabelField> {
    let prev = history.previous();
    let prev_value = |f: fn(&crate::Bar) -> f64| prev.map(f).unwrap_or(f64::NAN);
    let close = history.current().map(|b| b.close).unwrap_or(f64::NAN);

    vec![
        LabelField::from(OHLC_TAG),
        LabelField::from(symbol),
        LabelField::Number(prev_value(|b| b.open)),
        LabelField::Number(prev_value(|b| b.high)),
        LabelField::Number(prev_value(|b| b.low)),
        LabelField::Number(prev_value(|b| b.close)),
        LabelField::Number(close),
    ]
}

/// `symbol|before_market|after_market|actual|estimated`, missing figures as `-1`.
pub fn earnings_fields(symbol: &Symbol, event: Option<&EarningsEvent>) -> Vec<LabelField> {
    let before = event.is_some_and(|e| e.is_before_market());
    let after = event.is_some_and(|e| e.is_after_market());
    let actual = event.and_then(|e| e.actual).unwrap_or(f64::NAN);
    let estimated = event.and_then(|e| e.estimated).unwrap_or(f64::NAN);

    vec![
        LabelField::from(symbol),
        LabelField::Flag(before),
        LabelField::Flag(after),
        LabelField::Number(or_sentinel(actual)),
        LabelField::Number(or_sentinel(estimated)),
    ]
}

// =============================================================================
// Decoding (downstream side of the contract)
// =============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum LabelParseError {
    #[error("label has {found} fields, expected {expected}: '{label}'")]
    FieldCount {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("field {index} is not a number: '{value}'")]
    BadNumber { index: usize, value: String },

    #[error("field {index} is not a 0/1 flag: '{value}'")]
    BadFlag { index: usize, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcLabel {
    pub symbol: String,
    pub prev_open: f64,
    pub prev_high: f64,
    pub prev_low: f64,
    pub prev_close: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsLabel {
    pub symbol: String,
    pub before_market: bool,
    pub after_market: bool,
    /// `None` when the label carried the `-1` sentinel
    pub actual: Option<f64>,
    pub estimated: Option<f64>,
}

/// A decoded open-marker label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum LabelRecord {
    Ohlc(OhlcLabel),
    Earnings(EarningsLabel),
}

impl LabelRecord {
    pub fn parse(label: &str) -> Result<Self, LabelParseError> {
        let fields: Vec<&str> = label.split(DELIMITER).collect();

        if fields.first() == Some(&OHLC_TAG) {
            expect_fields(label, &fields, 7)?;
            return Ok(LabelRecord::Ohlc(OhlcLabel {
                symbol: fields[1].to_string(),
                prev_open: parse_number(&fields, 2)?,
                prev_high: parse_number(&fields, 3)?,
                prev_low: parse_number(&fields, 4)?,
                prev_close: parse_number(&fields, 5)?,
                close: parse_number(&fields, 6)?,
            }));
        }

        expect_fields(label, &fields, 5)?;
        Ok(LabelRecord::Earnings(EarningsLabel {
            symbol: fields[0].to_string(),
            before_market: parse_flag(&fields, 1)?,
            after_market: parse_flag(&fields, 2)?,
            actual: from_sentinel(parse_number(&fields, 3)?),
            estimated: from_sentinel(parse_number(&fields, 4)?),
        }))
    }

    pub fn symbol(&self) -> &str {
        match self {
            LabelRecord::Ohlc(l) => &l.symbol,
            LabelRecord::Earnings(l) => &l.symbol,
        }
    }
}

impl FromStr for LabelRecord {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LabelRecord::parse(s)
    }
}

fn expect_fields(label: &str, fields: &[&str], expected: usize) -> Result<(), LabelParseError> {
    if fields.len() != expected {
        return Err(LabelParseError::FieldCount {
            label: label.to_string(),
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn parse_number(fields: &[&str], index: usize) -> Result<f64, LabelParseError> {
    fields[index]
        .parse::<f64>()
        .map_err(|_| LabelParseError::BadNumber {
            index,
            value: fields[index].to_string(),
        })
}

fn parse_flag(fields: &[&str], index: usize) -> Result<bool, LabelParseError> {
    match fields[index] {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(LabelParseError::BadFlag {
            index,
            value: other.to_string(),
        }),
    }
}

fn from_sentinel(value: f64) -> Option<f64> {
    if value == MISSING_SENTINEL || value.is_nan() {
        None
    } else {
        Some(value)
    }
}
