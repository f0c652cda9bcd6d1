//! Lookback buffer of recent bars
//!
//! Scripts read earlier bars through an explicit offset: `get(0)` is the bar
//! being evaluated, `get(1)` the one before it, and so on up to the buffer
//! capacity. Older bars fall off the back.

use std::collections::VecDeque;

use crate::Bar;

#[derive(Debug, Clone)]
pub struct BarHistory {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarHistory {
    /// Capacity is clamped to at least one (the current bar).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer sized for a script that looks back `lookback` bars.
    pub fn for_lookback(lookback: usize) -> Self {
        Self::new(lookback + 1)
    }

    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    /// Overwrite the current bar (an intra-bar update of the same interval).
    pub fn replace_current(&mut self, bar: Bar) {
        match self.bars.back_mut() {
            Some(last) => *last = bar,
            None => self.bars.push_back(bar),
        }
    }

    /// Bar `offset` positions back from the current one.
    pub fn get(&self, offset: usize) -> Option<&Bar> {
        let len = self.bars.len();
        if offset >= len {
            return None;
        }
        self.bars.get(len - 1 - offset)
    }

    pub fn current(&self) -> Option<&Bar> {
        self.get(0)
    }

    pub fn previous(&self) -> Option<&Bar> {
        self.get(1)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(i: i64) -> Bar {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let p = 100.0 + i as f64;
        Bar::new_unchecked(t0 + Duration::minutes(i), p, p + 1.0, p - 1.0, p, 10.0)
    }

    #[test]
    fn test_lookback_offsets() {
        let mut history = BarHistory::new(3);
        assert!(history.current().is_none());

        history.push(bar(0));
        assert_eq!(history.current().unwrap().open, 100.0);
        assert!(history.previous().is_none());

        history.push(bar(1));
        assert_eq!(history.current().unwrap().open, 101.0);
        assert_eq!(history.previous().unwrap().open, 100.0);
    }

    #[test]
    fn test_oldest_bar_evicted() {
        let mut history = BarHistory::new(2);
        for i in 0..5 {
            history.push(bar(i));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(0).unwrap().open, 104.0);
        assert_eq!(history.get(1).unwrap().open, 103.0);
        assert!(history.get(2).is_none());
    }

    #[test]
    fn test_replace_current() {
        let mut history = BarHistory::for_lookback(1);
        history.push(bar(0));
        history.push(bar(1));

        let mut update = bar(1);
        update.close = 250.0;
        history.replace_current(update);

        assert_eq!(history.len(), 2);
        assert_eq!(history.current().unwrap().close, 250.0);
        assert_eq!(history.previous().unwrap().open, 100.0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = BarHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.push(bar(0));
        history.push(bar(1));
        assert_eq!(history.len(), 1);
    }
}
