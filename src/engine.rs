//! Per-bar evaluation engine
//!
//! Feeds each symbol's bars to the script in timestamp order, one evaluation
//! per bar, and collects the emitted marker pairs. Symbols are independent and
//! may run in parallel; bars within a symbol never do.

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::aggregation::AggregationPeriod;
use crate::earnings::EarningsCalendar;
use crate::history::BarHistory;
use crate::markers::emit_pair;
use crate::scripts::{BarContext, MarkerScript};
use crate::{Bar, Marker, Symbol};

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub period: AggregationPeriod,
    /// Exchange time zone for session times and trading dates
    pub timezone: Tz,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            period: AggregationPeriod::ONE_MINUTE,
            timezone: chrono_tz::America::New_York,
        }
    }
}

/// Outcome of running one symbol's bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRun {
    pub symbol: Symbol,
    pub bars_evaluated: usize,
    pub bars_fired: usize,
    /// Repeated or out-of-order timestamps that were not evaluated
    pub bars_skipped: usize,
    pub markers: Vec<Marker>,
}

impl SymbolRun {
    fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bars_evaluated: 0,
            bars_fired: 0,
            bars_skipped: 0,
            markers: Vec::new(),
        }
    }
}

pub struct MarkerEngine {
    script: Box<dyn MarkerScript>,
    settings: EngineSettings,
    earnings: Option<EarningsCalendar>,
}

impl MarkerEngine {
    pub fn new(
        script: Box<dyn MarkerScript>,
        settings: EngineSettings,
        earnings: Option<EarningsCalendar>,
    ) -> Result<Self> {
        if script.requires_earnings() && earnings.is_none() {
            anyhow::bail!(
                "Script '{}' needs an earnings calendar (set market.earnings_file)",
                script.name()
            );
        }
        Ok(Self {
            script,
            settings,
            earnings,
        })
    }

    pub fn script(&self) -> &dyn MarkerScript {
        self.script.as_ref()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Evaluate one symbol's bars in order.
    pub fn run_symbol(&self, symbol: &Symbol, bars: &[Bar]) -> SymbolRun {
        let declaration = self.script.declaration();
        let color = self.script.color();
        let mut history = BarHistory::for_lookback(self.script.lookback());
        let mut run = SymbolRun::new(symbol.clone());
        let mut last_time: Option<DateTime<Utc>> = None;
        let mut last_fired = false;

        for bar in bars {
            match last_time {
                Some(last) if bar.datetime < last => {
                    debug!(symbol = %symbol, at = %bar.datetime, "Skipping out-of-order bar");
                    run.bars_skipped += 1;
                    continue;
                }
                Some(last) if bar.datetime == last => {
                    if declaration.once_per_bar {
                        run.bars_skipped += 1;
                        continue;
                    }
                    // Intra-bar update: the new evaluation supersedes the old one.
                    if last_fired {
                        run.markers.truncate(run.markers.len().saturating_sub(2));
                        run.bars_fired -= 1;
                    }
                    history.replace_current(bar.clone());
                }
                _ => history.push(bar.clone()),
            }
            last_time = Some(bar.datetime);

            let ctx = BarContext {
                symbol,
                bar,
                history: &history,
                period: self.settings.period,
                timezone: self.settings.timezone,
                earnings: self.earnings.as_ref(),
            };
            let decision = self.script.evaluate(&ctx);
            run.bars_evaluated += 1;

            last_fired = match emit_pair(symbol, bar, &decision, color) {
                Some(pair) => {
                    debug!(symbol = %symbol, at = %bar.datetime, label = %decision.label, "Marker pair emitted");
                    run.markers.extend(pair);
                    run.bars_fired += 1;
                    true
                }
                None => false,
            };
        }

        debug!(
            symbol = %symbol,
            evaluated = run.bars_evaluated,
            fired = run.bars_fired,
            skipped = run.bars_skipped,
            "Symbol complete"
        );
        run
    }

    /// Evaluate every symbol. Results are ordered by symbol.
    pub fn run(&self, data: &HashMap<Symbol, Vec<Bar>>, sequential: bool) -> Vec<SymbolRun> {
        let mut symbols: Vec<&Symbol> = data.keys().collect();
        symbols.sort();

        info!(
            "Running script '{}' over {} symbols ({})",
            self.script.name(),
            symbols.len(),
            if sequential { "sequential" } else { "parallel" }
        );

        if sequential {
            symbols
                .into_iter()
                .map(|s| self.run_symbol(s, &data[s]))
                .collect()
        } else {
            symbols
                .into_par_iter()
                .map(|s| self.run_symbol(s, &data[s]))
                .collect()
        }
    }
}

/// Totals across runs: (evaluated, fired, skipped, markers)
pub fn totals(runs: &[SymbolRun]) -> (usize, usize, usize, usize) {
    runs.iter().fold((0, 0, 0, 0), |acc, r| {
        (
            acc.0 + r.bars_evaluated,
            acc.1 + r.bars_fired,
            acc.2 + r.bars_skipped,
            acc.3 + r.markers.len(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts::BarDecision;
    use crate::{Color, ScriptDeclaration};
    use chrono::{Duration, TimeZone};

    /// Fires when close > open; label is the close. Evaluates every tick.
    struct TickScript;

    impl MarkerScript for TickScript {
        fn name(&self) -> &'static str {
            "tick"
        }

        fn declaration(&self) -> ScriptDeclaration {
            ScriptDeclaration {
                once_per_bar: false,
                ..Default::default()
            }
        }

        fn color(&self) -> Color {
            Color::Green
        }

        fn evaluate(&self, ctx: &BarContext) -> BarDecision {
            BarDecision {
                fire: ctx.bar.close > ctx.bar.open,
                label: ctx.bar.close.to_string(),
            }
        }
    }

    /// Always fires, once per bar.
    struct EveryBar;

    impl MarkerScript for EveryBar {
        fn name(&self) -> &'static str {
            "every_bar"
        }

        fn evaluate(&self, ctx: &BarContext) -> BarDecision {
            BarDecision {
                fire: true,
                label: format!("{}", ctx.history.len()),
            }
        }
    }

    struct NeedsEarnings;

    impl MarkerScript for NeedsEarnings {
        fn name(&self) -> &'static str {
            "needs_earnings"
        }

        fn requires_earnings(&self) -> bool {
            true
        }

        fn evaluate(&self, _ctx: &BarContext) -> BarDecision {
            BarDecision {
                fire: false,
                label: String::new(),
            }
        }
    }

    fn bar_at(minute: i64, open: f64, close: f64) -> Bar {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        let high = open.max(close) + 1.0;
        let low = open.min(close) - 1.0;
        Bar::new_unchecked(t0 + Duration::minutes(minute), open, high, low, close, 0.0)
    }

    #[test]
    fn test_once_per_bar_skips_repeated_and_out_of_order() {
        let engine = MarkerEngine::new(Box::new(EveryBar), EngineSettings::default(), None).unwrap();
        let bars = vec![
            bar_at(0, 10.0, 11.0),
            bar_at(0, 10.0, 12.0),
            bar_at(1, 11.0, 12.0),
            bar_at(0, 10.0, 13.0),
            bar_at(2, 12.0, 13.0),
        ];
        let run = engine.run_symbol(&Symbol::new("XYZ"), &bars);
        assert_eq!(run.bars_evaluated, 3);
        assert_eq!(run.bars_skipped, 2);
        assert_eq!(run.bars_fired, 3);
        assert_eq!(run.markers.len(), 6);
    }

    #[test]
    fn test_tick_updates_replace_previous_evaluation() {
        let engine = MarkerEngine::new(Box::new(TickScript), EngineSettings::default(), None).unwrap();
        let bars = vec![
            bar_at(0, 10.0, 11.0), // fires
            bar_at(0, 10.0, 9.0),  // same bar, now down: retracts
            bar_at(1, 9.0, 9.5),   // fires
            bar_at(1, 9.0, 9.8),   // same bar, still up: replaces label
        ];
        let run = engine.run_symbol(&Symbol::new("XYZ"), &bars);
        assert_eq!(run.bars_evaluated, 4);
        assert_eq!(run.bars_skipped, 0);
        assert_eq!(run.bars_fired, 1);
        assert_eq!(run.markers.len(), 2);
        assert_eq!(run.markers[0].name, "9.8");
        assert_eq!(run.markers[0].color, Color::Green);
    }

    #[test]
    fn test_history_is_per_symbol() {
        let engine = MarkerEngine::new(Box::new(EveryBar), EngineSettings::default(), None).unwrap();
        let mut data = HashMap::new();
        data.insert(Symbol::new("BBB"), vec![bar_at(0, 1.0, 2.0)]);
        data.insert(
            Symbol::new("AAA"),
            vec![bar_at(0, 1.0, 2.0), bar_at(1, 2.0, 3.0)],
        );

        let runs = engine.run(&data, false);
        assert_eq!(runs[0].symbol, Symbol::new("AAA"));
        assert_eq!(runs[1].symbol, Symbol::new("BBB"));
        // EveryBar has no lookback, so the history never holds more than one bar.
        assert!(runs
            .iter()
            .flat_map(|r| &r.markers)
            .all(|m| m.name == "1" || m.name == "SellClose"));
        assert_eq!(totals(&runs), (3, 3, 0, 6));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let engine = MarkerEngine::new(Box::new(TickScript), EngineSettings::default(), None).unwrap();
        let mut data = HashMap::new();
        for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
            let bars = (0..20)
                .map(|m| bar_at(m, 10.0 + i as f64, 10.0 + ((m % 3) as f64) - 1.0))
                .collect();
            data.insert(Symbol::new(name), bars);
        }
        assert_eq!(engine.run(&data, true), engine.run(&data, false));
    }

    #[test]
    fn test_missing_earnings_calendar_rejected() {
        let result = MarkerEngine::new(Box::new(NeedsEarnings), EngineSettings::default(), None);
        assert!(result.is_err());
        let result = MarkerEngine::new(
            Box::new(NeedsEarnings),
            EngineSettings::default(),
            Some(EarningsCalendar::new()),
        );
        assert!(result.is_ok());
    }
}
