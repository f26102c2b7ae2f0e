//! Momentum signal: RSI extreme plus a same-bar MACD cross.
//!
//! Long requires oversold RSI *and* the MACD line crossing above its signal
//! line on this bar; short is the mirror. Either condition alone is noise.

use crate::domain::{Bar, Direction, Signal, SignalContext};
use crate::error::ConfigError;
use crate::fixed::{Frac, FRAC_SCALE};
use crate::indicators::{macd, rsi};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub rsi_period: usize,
    /// RSI below this (at FRAC_SCALE, 300_000 = 30) is oversold.
    pub rsi_oversold: Frac,
    /// RSI above this (700_000 = 70) is overbought.
    pub rsi_overbought: Frac,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 300_000,
            rsi_overbought: 700_000,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl MomentumParams {
    /// MACD needs slow + signal EMAs plus one prior bar for the cross.
    pub fn warmup_bars(&self) -> usize {
        (self.macd_slow + self.macd_signal).max(self.rsi_period + 1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::StrategyParam {
            name: "momentum",
            reason,
        };
        if self.rsi_period < 2 {
            return Err(fail(format!("rsi_period must be >= 2, got {}", self.rsi_period)));
        }
        if !(0 < self.rsi_oversold && self.rsi_oversold < self.rsi_overbought) {
            return Err(fail("requires 0 < rsi_oversold < rsi_overbought".into()));
        }
        if self.rsi_overbought >= FRAC_SCALE {
            return Err(fail(format!(
                "rsi_overbought must be < 100%, got {}",
                self.rsi_overbought
            )));
        }
        if self.macd_fast < 1 || self.macd_slow <= self.macd_fast {
            return Err(fail("requires macd_slow > macd_fast >= 1".into()));
        }
        if self.macd_signal < 1 {
            return Err(fail("macd_signal must be >= 1".into()));
        }
        Ok(())
    }

    pub fn signal(&self, bars: &[Bar], index: usize) -> Option<Signal> {
        if index < self.warmup_bars() {
            return None;
        }

        let closes: Vec<_> = bars[..=index].iter().map(|b| b.close).collect();
        let rsi_series = rsi(&closes, self.rsi_period);
        let macd_series = macd(&closes, self.macd_fast, self.macd_slow, self.macd_signal);

        let current_rsi = rsi_series[index]?;
        let current = macd_series[index]?;
        let prev = macd_series[index - 1]?;

        let bullish_cross = prev.macd < prev.signal && current.macd > current.signal;
        let bearish_cross = prev.macd > prev.signal && current.macd < current.signal;

        let context = SignalContext::Momentum {
            rsi: current_rsi,
            macd: current.macd,
            signal_line: current.signal,
        };

        if current_rsi < self.rsi_oversold && bullish_cross {
            // More oversold, more conviction.
            return Some(Signal {
                bar_index: index,
                direction: Direction::Long,
                strength: FRAC_SCALE - current_rsi,
                entry_hint: bars[index].close,
                stop_hint: None,
                target_hint: None,
                context,
            });
        }

        if current_rsi > self.rsi_overbought && bearish_cross {
            let strength = ((current_rsi - FRAC_SCALE / 2) * 2).clamp(0, FRAC_SCALE);
            return Some(Signal {
                bar_index: index,
                direction: Direction::Short,
                strength,
                entry_hint: bars[index].close,
                stop_hint: None,
                target_hint: None,
                context,
            });
        }

        None
    }
}
