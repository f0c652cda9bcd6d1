//! OHLC Export Configuration

use serde::{Deserialize, Serialize};

use crate::session::{ClockTime, EvalPoint, SessionWindow};
use crate::Color;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcConfig {
    /// Session start as HHMM in exchange time (default: 930)
    #[serde(default = "default_start_of_day", alias = "start_time")]
    pub start_of_day: ClockTime,

    /// Session end as HHMM in exchange time (default: 1600)
    #[serde(default = "default_end_of_day", alias = "end_time")]
    pub end_of_day: ClockTime,

    /// Marker color (default: black)
    #[serde(default)]
    pub color: Color,

    /// Bar instant the session gate reads (default: first_minute)
    #[serde(default)]
    pub evaluate_at: EvalPoint,
}

fn default_start_of_day() -> ClockTime {
    SessionWindow::default().start
}

fn default_end_of_day() -> ClockTime {
    SessionWindow::default().end
}

impl OhlcConfig {
    pub fn window(&self) -> SessionWindow {
        SessionWindow::new(self.start_of_day, self.end_of_day)
    }
}

impl Default for OhlcConfig {
    fn default() -> Self {
        Self {
            start_of_day: default_start_of_day(),
            end_of_day: default_end_of_day(),
            color: Color::Black,
            evaluate_at: EvalPoint::FirstMinute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: OhlcConfig = serde_json::from_str(r#"{"name": "ohlc"}"#).unwrap();
        assert_eq!(config.start_of_day.hhmm(), 930);
        assert_eq!(config.end_of_day.hhmm(), 1600);
        assert_eq!(config.color, Color::Black);
        assert_eq!(config.evaluate_at, EvalPoint::FirstMinute);
    }

    #[test]
    fn test_alias_and_color() {
        let config: OhlcConfig =
            serde_json::from_str(r#"{"start_time": 800, "end_time": 1700, "color": "white"}"#)
                .unwrap();
        assert_eq!(config.window(), SessionWindow::from_hhmm(800, 1700));
        assert_eq!(config.color, Color::White);
    }

    #[test]
    fn test_unusual_times_accepted_as_numbers() {
        let config: OhlcConfig =
            serde_json::from_str(r#"{"start_of_day": 930, "end_of_day": 2400}"#).unwrap();
        assert_eq!(config.end_of_day.seconds(), 24 * 3600);

        let config: OhlcConfig = serde_json::from_str(r#"{"end_of_day": 1675}"#).unwrap();
        assert_eq!(config.end_of_day.hhmm(), 1675);
        assert_eq!(config.end_of_day.seconds(), 17 * 3600 + 15 * 60);
    }
}
