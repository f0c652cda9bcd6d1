//! OHLC Export Script - per-bar session gate with an OHLC label

use crate::label::ohlc_fields;
use crate::scripts::{render_label, BarContext, BarDecision, MarkerScript};
use crate::session::{EvalPoint, SessionWindow};
use crate::Color;

use super::config::OhlcConfig;

pub struct OhlcScript {
    window: SessionWindow,
    color: Color,
    evaluate_at: EvalPoint,
}

impl OhlcScript {
    pub fn new(config: OhlcConfig) -> Self {
        Self {
            window: config.window(),
            color: config.color,
            evaluate_at: config.evaluate_at,
        }
    }

    pub fn window(&self) -> SessionWindow {
        self.window
    }
}

impl MarkerScript for OhlcScript {
    fn name(&self) -> &'static str {
        super::NAME
    }

    fn lookback(&self) -> usize {
        1
    }

    fn color(&self) -> Color {
        self.color
    }

    fn evaluate(&self, ctx: &BarContext) -> BarDecision {
        let fire = self.window.gate_for_bar(
            ctx.period,
            ctx.bar.datetime,
            ctx.timezone,
            self.evaluate_at,
        );
        let label = render_label(ctx.symbol, &ohlc_fields(ctx.symbol, ctx.history));
        BarDecision { fire, label }
    }
}
