//! Bar — the fundamental market data unit.

use crate::fixed::Price;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One OHLCV observation. Prices are scaled integers; immutable once the
/// series enters a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: u64,
}

impl Bar {
    /// OHLC sanity check: `0 < low <= open,close <= high`.
    pub fn is_sane(&self) -> bool {
        self.low > 0
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// A zero-volume bar is a trading halt: no fills, mark-to-market only.
    pub fn is_halted(&self) -> bool {
        self.volume == 0
    }

    pub fn range(&self) -> Price {
        self.high - self.low
    }
}
