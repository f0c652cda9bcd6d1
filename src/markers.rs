//! Marker emission
//!
//! A firing bar produces exactly one matched pair: a buy-to-open marker at the
//! bar's low carrying the script's label, and a sell-to-close marker at the
//! bar's high. Both use the same gate, so a pair is never split.

use crate::label::CLOSE_MARKER_NAME;
use crate::scripts::BarDecision;
use crate::{Bar, Color, Marker, MarkerKind, Symbol};

/// Every marker is emitted for one unit.
pub const MARKER_QUANTITY: u32 = 1;

pub fn emit_pair(
    symbol: &Symbol,
    bar: &Bar,
    decision: &BarDecision,
    color: Color,
) -> Option<[Marker; 2]> {
    if !decision.fire {
        return None;
    }

    let open = Marker {
        symbol: symbol.clone(),
        datetime: bar.datetime,
        kind: MarkerKind::BuyToOpen,
        price: bar.low,
        quantity: MARKER_QUANTITY,
        color,
        name: decision.label.clone(),
    };
    let close = Marker {
        symbol: symbol.clone(),
        datetime: bar.datetime,
        kind: MarkerKind::SellToClose,
        price: bar.high,
        quantity: MARKER_QUANTITY,
        color,
        name: CLOSE_MARKER_NAME.to_string(),
    };

    Some([open, close])
}
