//! BarSeries — a validated, chronologically sorted bar sequence.
//!
//! The engine assumes its input is complete and sane before the loop starts.
//! Validation is fatal on the first offending bar; split adjustment rewrites
//! history consistently before the series is handed to a run.

use crate::domain::Bar;
use crate::error::DataError;
use crate::fixed::mul_div;
use serde::{Deserialize, Serialize};

/// One symbol's bar history.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

/// A split or reverse split taking effect at `bar_index`.
///
/// A 2-for-1 split is `{ numerator: 2, denominator: 1 }`: every bar before
/// `bar_index` has its prices divided by 2 and its volume multiplied by 2,
/// so the whole series is stated in post-split units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEvent {
    pub bar_index: usize,
    pub numerator: u32,
    pub denominator: u32,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Check the integrity invariants: non-empty, strictly increasing dates
    /// (which also rules out duplicates), sane OHLC on every bar.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.bars.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: self.symbol.clone(),
            });
        }
        for (index, bar) in self.bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(DataError::InvalidOhlc { index });
            }
            if index > 0 {
                let prev = self.bars[index - 1].date;
                if bar.date <= prev {
                    return Err(DataError::NonIncreasingDate {
                        index,
                        date: bar.date,
                        prev,
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply split adjustments so all bars are stated in the latest share
    /// units. Each event rescales every bar strictly before its index.
    pub fn adjust_for_splits(&mut self, events: &[SplitEvent]) -> Result<(), DataError> {
        for event in events {
            if event.bar_index >= self.bars.len() {
                return Err(DataError::SplitOutOfRange {
                    index: event.bar_index,
                    len: self.bars.len(),
                });
            }
            if event.numerator == 0 || event.denominator == 0 {
                return Err(DataError::InvalidSplit {
                    index: event.bar_index,
                });
            }
            let num = event.numerator as i64;
            let den = event.denominator as i64;
            for bar in &mut self.bars[..event.bar_index] {
                bar.open = mul_div(bar.open, den, num);
                bar.high = mul_div(bar.high, den, num);
                bar.low = mul_div(bar.low, den, num);
                bar.close = mul_div(bar.close, den, num);
                bar.volume = (bar.volume as u128 * num as u128 / den as u128) as u64;
            }
        }
        Ok(())
    }
}
