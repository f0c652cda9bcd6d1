//! Session window gating
//!
//! Intraday bars fire only inside the configured session, with a one-minute
//! margin on both edges: a bar fires while at least 60 seconds remain before
//! the session end and no more than 60 seconds before the session start.
//! Daily and coarser bars always fire.
//!
//! Session bounds are HHMM integers taken at face value: `2400` is midnight at
//! the end of the day, `975` is 10:15. Nothing is range-checked; unusual values
//! only shift where the gate opens and closes.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

use crate::aggregation::AggregationPeriod;

/// Seconds of grace on each edge of the session
pub const EDGE_MARGIN_SECS: i64 = 60;

/// A time of day written as an HHMM integer (`930` is 09:30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockTime(i32);

impl ClockTime {
    pub const fn from_hhmm(hhmm: i32) -> Self {
        ClockTime(hhmm)
    }

    pub fn hhmm(&self) -> i32 {
        self.0
    }

    /// Seconds after midnight, `(hhmm / 100) * 3600 + (hhmm % 100) * 60`.
    pub fn seconds(&self) -> i64 {
        let hhmm = i64::from(self.0);
        (hhmm / 100) * 3600 + (hhmm % 100) * 60
    }

    /// Whether this is an ordinary 00:00..=23:59 clock reading
    pub fn is_clock_reading(&self) -> bool {
        (0..=2359).contains(&self.0) && self.0 % 100 < 60
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 0 {
            write!(f, "{:02}:{:02}", self.0 / 100, self.0 % 100)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(ClockTime::from_hhmm)
    }
}

fn seconds_of_day(now: NaiveTime) -> i64 {
    i64::from(now.num_seconds_from_midnight())
}

/// Seconds from `now` until `target` on the same day. Negative once `target` has passed.
pub fn seconds_till_time(now: NaiveTime, target: ClockTime) -> i64 {
    target.seconds() - seconds_of_day(now)
}

/// Seconds elapsed since `target` on the same day. Negative before `target`.
pub fn seconds_from_time(now: NaiveTime, target: ClockTime) -> i64 {
    seconds_of_day(now) - target.seconds()
}

/// Per-bar fire decision for the session-gated scripts.
///
/// Total over its inputs: a reversed window (`start > end`) or an out-of-range
/// bound is evaluated numerically like any other and never raises an error.
pub fn evaluate_gate(
    period: AggregationPeriod,
    now: NaiveTime,
    session_start: ClockTime,
    session_end: ClockTime,
) -> bool {
    if period.is_daily_or_coarser() {
        return true;
    }
    seconds_till_time(now, session_end) >= EDGE_MARGIN_SECS
        && seconds_from_time(now, session_start) >= -EDGE_MARGIN_SECS
}

/// Which instant of a bar the gate reads its time of day from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalPoint {
    /// The bar's opening timestamp
    BarOpen,
    /// One minute into the bar, or the bar's close if it is shorter
    #[default]
    FirstMinute,
    /// The instant the bar completes (timestamp + bar length)
    BarClose,
}

/// Start/end times of the trading session in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl SessionWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        for (edge, time) in [("start", start), ("end", end)] {
            if !time.is_clock_reading() {
                warn!(
                    hhmm = time.hhmm(),
                    "Session {} is not a 00:00-23:59 time; using it as {} seconds after midnight",
                    edge,
                    time.seconds()
                );
            }
        }
        if start.seconds() > end.seconds() {
            warn!(
                start = %start,
                end = %end,
                "Session start is after session end; intraday bars will never fire"
            );
        }
        Self { start, end }
    }

    pub fn from_hhmm(start: i32, end: i32) -> Self {
        Self::new(ClockTime::from_hhmm(start), ClockTime::from_hhmm(end))
    }

    pub fn gate(&self, period: AggregationPeriod, now: NaiveTime) -> bool {
        evaluate_gate(period, now, self.start, self.end)
    }

    /// Gate for a bar stamped `bar_time`, read in the exchange time zone.
    pub fn gate_for_bar(
        &self,
        period: AggregationPeriod,
        bar_time: DateTime<Utc>,
        tz: Tz,
        eval_point: EvalPoint,
    ) -> bool {
        if period.is_daily_or_coarser() {
            return true;
        }
        let instant = eval_instant(period, bar_time, eval_point);
        self.gate(period, instant.with_timezone(&tz).time())
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            start: ClockTime::from_hhmm(930),
            end: ClockTime::from_hhmm(1600),
        }
    }
}

/// The instant a bar is evaluated at.
pub fn eval_instant(
    period: AggregationPeriod,
    bar_time: DateTime<Utc>,
    eval_point: EvalPoint,
) -> DateTime<Utc> {
    match (eval_point, period.intraday_length()) {
        (EvalPoint::FirstMinute, Some(len)) => bar_time + len.min(Duration::minutes(1)),
        (EvalPoint::BarClose, Some(len)) => bar_time + len,
        _ => bar_time,
    }
}
