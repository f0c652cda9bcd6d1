//! Earnings Export Script - fires on announcement dates

use crate::label::earnings_fields;
use crate::scripts::{render_label, BarContext, BarDecision, MarkerScript};
use crate::Color;

use super::config::EarningsScriptConfig;

pub struct EarningsScript {
    color: Color,
}

impl EarningsScript {
    pub fn new(config: EarningsScriptConfig) -> Self {
        Self {
            color: config.color,
        }
    }
}

impl MarkerScript for EarningsScript {
    fn name(&self) -> &'static str {
        super::NAME
    }

    fn color(&self) -> Color {
        self.color
    }

    fn requires_earnings(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &BarContext) -> BarDecision {
        let date = ctx.session_date();
        let event = ctx.earnings.and_then(|cal| cal.event(ctx.symbol, date));
        let label = render_label(ctx.symbol, &earnings_fields(ctx.symbol, event));
        BarDecision {
            fire: event.is_some(),
            label,
        }
    }
}
