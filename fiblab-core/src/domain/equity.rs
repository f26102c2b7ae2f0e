//! EquityPoint — one mark-to-market observation per bar.

use crate::fixed::{Cash, Frac};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point on the equity curve.
///
/// Invariant: `equity == cash + sum(open position mark-to-market)` at the
/// bar this point was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub cash: Cash,
    pub equity: Cash,
    /// Fraction below the running equity peak, at FRAC_SCALE. Zero at a new
    /// peak.
    pub drawdown: Frac,
}
