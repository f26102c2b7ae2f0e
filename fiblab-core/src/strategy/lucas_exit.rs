//! Lucas time-based exit overlay.
//!
//! Generates no entries. For any open position, the recent volatility
//! regime (ATR over close) selects a Lucas number of bars to hold: high
//! volatility cuts the hold to L(2) = 3 bars, a calm market stretches it to
//! L(6) = 18, anything in between holds L(4) = 7. Deterministic given the
//! entry bar and the volatility bucket.

use crate::domain::{Bar, ExitReason, Position};
use crate::error::ConfigError;
use crate::fixed::{div_frac, Frac, FRAC_SCALE};
use crate::indicators::atr;
use crate::sequences::SequenceTables;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LucasExitParams {
    pub atr_period: usize,
    /// ATR/close below this fraction is the calm bucket.
    pub low_vol: Frac,
    /// ATR/close above this fraction is the turbulent bucket.
    pub high_vol: Frac,
    /// Hard cap on the hold, whatever the bucket says. L(8) = 47.
    pub max_hold_bars: usize,
}

impl Default for LucasExitParams {
    fn default() -> Self {
        Self {
            atr_period: 14,
            low_vol: 10_000,  // 1%
            high_vol: 25_000, // 2.5%
            max_hold_bars: 47,
        }
    }
}

/// Lucas indices per volatility bucket: L(6)=18, L(4)=7, L(2)=3.
const CALM_INDEX: usize = 6;
const NORMAL_INDEX: usize = 4;
const TURBULENT_INDEX: usize = 2;

impl LucasExitParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::StrategyParam {
            name: "lucas_time_exit",
            reason,
        };
        if self.atr_period < 1 {
            return Err(fail("atr_period must be >= 1".into()));
        }
        if !(0 < self.low_vol && self.low_vol < self.high_vol) {
            return Err(fail("requires 0 < low_vol < high_vol".into()));
        }
        if self.high_vol >= FRAC_SCALE {
            return Err(fail(format!("high_vol must be < 100%, got {}", self.high_vol)));
        }
        if self.max_hold_bars < 1 {
            return Err(fail("max_hold_bars must be >= 1".into()));
        }
        Ok(())
    }

    /// Bars to hold under the volatility observed at `index`.
    pub fn hold_bars(&self, bars: &[Bar], index: usize, tables: &SequenceTables) -> usize {
        let lucas_index = match self.volatility_frac(bars, index) {
            Some(vol) if vol < self.low_vol => CALM_INDEX,
            Some(vol) if vol > self.high_vol => TURBULENT_INDEX,
            _ => NORMAL_INDEX,
        };
        (tables.lucas(lucas_index) as usize).min(self.max_hold_bars)
    }

    /// ATR over close at `index`, as a fraction. None while the ATR warms up.
    fn volatility_frac(&self, bars: &[Bar], index: usize) -> Option<Frac> {
        let window = &bars[..=index];
        let value = atr(window, self.atr_period)[index]?;
        let close = bars[index].close;
        if close <= 0 {
            return None;
        }
        Some(div_frac(value, close))
    }

    pub fn check_exit(
        &self,
        bars: &[Bar],
        index: usize,
        position: &Position,
        tables: &SequenceTables,
    ) -> Option<ExitReason> {
        let age = index - position.entry_bar;
        if age >= self.hold_bars(bars, index, tables) {
            Some(ExitReason::TimeExit)
        } else {
            None
        }
    }
}
