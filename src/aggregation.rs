//! Bar aggregation periods
//!
//! An [`AggregationPeriod`] pairs a non-zero amount with a [`PeriodUnit`] and is
//! written in exchange interval notation: `"1m"`, `"5m"`, `"1h"`, `"1d"`, `"1w"`,
//! `"1M"`. Minute (`m`) and month (`M`) differ only by case.

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("empty aggregation period")]
    Empty,

    #[error("invalid amount in aggregation period '{0}'")]
    InvalidAmount(String),

    #[error("unknown unit '{unit}' in aggregation period '{input}' (expected m, h, d, w or M)")]
    UnknownUnit { input: String, unit: char },
}

/// Aggregation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl PeriodUnit {
    fn suffix(self) -> char {
        match self {
            PeriodUnit::Minute => 'm',
            PeriodUnit::Hour => 'h',
            PeriodUnit::Day => 'd',
            PeriodUnit::Week => 'w',
            PeriodUnit::Month => 'M',
        }
    }
}

/// Amount × unit, e.g. 5-Minute or 1-Day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregationPeriod {
    pub amount: NonZeroU32,
    pub unit: PeriodUnit,
}

impl AggregationPeriod {
    pub const fn new(amount: NonZeroU32, unit: PeriodUnit) -> Self {
        Self { amount, unit }
    }

    pub const ONE_MINUTE: AggregationPeriod =
        AggregationPeriod::new(NonZeroU32::MIN, PeriodUnit::Minute);

    pub const ONE_DAY: AggregationPeriod = AggregationPeriod::new(NonZeroU32::MIN, PeriodUnit::Day);

    /// Daily bars and coarser each cover at least one full session.
    pub fn is_daily_or_coarser(&self) -> bool {
        self.unit >= PeriodUnit::Day
    }

    /// Length of one bar for intraday periods.
    pub fn intraday_length(&self) -> Option<Duration> {
        let amount = i64::from(self.amount.get());
        match self.unit {
            PeriodUnit::Minute => Some(Duration::minutes(amount)),
            PeriodUnit::Hour => Some(Duration::hours(amount)),
            _ => None,
        }
    }
}

impl fmt::Display for AggregationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for AggregationPeriod {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unit_char = s.chars().last().ok_or(PeriodParseError::Empty)?;
        let unit = match unit_char {
            'm' => PeriodUnit::Minute,
            'h' | 'H' => PeriodUnit::Hour,
            'd' | 'D' => PeriodUnit::Day,
            'w' | 'W' => PeriodUnit::Week,
            'M' => PeriodUnit::Month,
            other => {
                return Err(PeriodParseError::UnknownUnit {
                    input: s.to_string(),
                    unit: other,
                })
            }
        };

        let amount_str = &s[..s.len() - unit_char.len_utf8()];
        let amount = if amount_str.is_empty() {
            NonZeroU32::MIN
        } else {
            amount_str
                .parse::<NonZeroU32>()
                .map_err(|_| PeriodParseError::InvalidAmount(s.to_string()))?
        };

        Ok(AggregationPeriod::new(amount, unit))
    }
}

impl Serialize for AggregationPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AggregationPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
