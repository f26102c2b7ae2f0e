//! Channel breakout with volume confirmation.
//!
//! The channel is the rolling high/low of the lookback window *excluding*
//! the current bar. Volume confirmation is a hard gate: a breakout without
//! 1.618x average volume emits nothing, not a weak signal.

use crate::domain::{Bar, Direction, Signal, SignalContext};
use crate::error::ConfigError;
use crate::fixed::{mul_frac, mul_ratio, Frac, Price, FRAC_SCALE};
use crate::sequences::EXTENSION_RATIOS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutParams {
    pub lookback: usize,
    /// Bar volume must exceed this multiple (at FRAC_SCALE) of the rolling
    /// average volume.
    pub volume_multiplier: Frac,
    /// Structural stop distance just inside the broken channel level.
    pub stop_buffer: Frac,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self {
            lookback: 20,
            volume_multiplier: 1_618_000,
            stop_buffer: 20_000,
        }
    }
}

impl BreakoutParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::StrategyParam {
            name: "breakout",
            reason,
        };
        if self.lookback < 2 {
            return Err(fail(format!("lookback must be >= 2, got {}", self.lookback)));
        }
        if self.volume_multiplier <= 0 {
            return Err(fail("volume_multiplier must be positive".into()));
        }
        if !(0 <= self.stop_buffer && self.stop_buffer < FRAC_SCALE) {
            return Err(fail(format!("stop_buffer {} outside [0, 1)", self.stop_buffer)));
        }
        Ok(())
    }

    pub fn signal(&self, bars: &[Bar], index: usize) -> Option<Signal> {
        if index < self.lookback {
            return None;
        }

        // Channel over the lookback window, current bar excluded.
        let window = &bars[index - self.lookback..index];
        let channel_high: Price = window.iter().map(|b| b.high).max().unwrap();
        let channel_low: Price = window.iter().map(|b| b.low).min().unwrap();
        let range = channel_high - channel_low;
        if range == 0 {
            return None;
        }
        let avg_volume: u64 =
            (window.iter().map(|b| b.volume as u128).sum::<u128>() / self.lookback as u128) as u64;
        if avg_volume == 0 {
            return None;
        }

        let bar = &bars[index];
        let volume_ratio =
            (bar.volume as i128 * FRAC_SCALE as i128 / avg_volume as i128).min(i64::MAX as i128)
                as Frac;
        if volume_ratio <= self.volume_multiplier {
            // No volume confirmation, no signal. Hard gate.
            return None;
        }

        let context = SignalContext::Breakout {
            channel_high,
            channel_low,
            volume_ratio,
        };
        // Conviction from volume surge, capped at 3x average.
        let strength = (volume_ratio / 3).clamp(0, FRAC_SCALE);

        if bar.close > channel_high {
            return Some(Signal {
                bar_index: index,
                direction: Direction::Long,
                strength,
                entry_hint: bar.close,
                stop_hint: Some(channel_high - mul_frac(channel_high, self.stop_buffer)),
                target_hint: Some(channel_high + mul_ratio(range, EXTENSION_RATIOS[1])),
                context,
            });
        }
        if bar.close < channel_low {
            return Some(Signal {
                bar_index: index,
                direction: Direction::Short,
                strength,
                entry_hint: bar.close,
                stop_hint: Some(channel_low + mul_frac(channel_low, self.stop_buffer)),
                target_hint: Some(channel_low - mul_ratio(range, EXTENSION_RATIOS[1])),
                context,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// 20 quiet bars in a 95..105 channel, then a final bar with the given
    /// close and volume.
    fn bars_with_final(close: Price, volume: u64) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<Bar> = (0..20)
            .map(|i| Bar {
                date: base_date + chrono::Duration::days(i),
                open: 100_000_000,
                high: 105_000_000,
                low: 95_000_000,
                close: 100_000_000,
                volume: 1000,
            })
            .collect();
        bars.push(Bar {
            date: base_date + chrono::Duration::days(20),
            open: 100_000_000,
            high: close.max(106_000_000),
            low: close.min(95_000_000),
            close,
            volume,
        });
        bars
    }

    #[test]
    fn long_breakout_with_volume() {
        let params = BreakoutParams::default();
        let bars = bars_with_final(106_000_000, 2000);
        let signal = params.signal(&bars, 20).unwrap();
        assert_eq!(signal.direction, Direction::Long);
        match signal.context {
            SignalContext::Breakout {
                channel_high,
                channel_low,
                volume_ratio,
            } => {
                assert_eq!(channel_high, 105_000_000);
                assert_eq!(channel_low, 95_000_000);
                assert_eq!(volume_ratio, 2_000_000);
            }
            other => panic!("wrong context: {other:?}"),
        }
        // Stop just inside the channel, target at the 1.618 extension.
        assert_eq!(signal.stop_hint, Some(105_000_000 - 2_100_000));
        assert_eq!(signal.target_hint, Some(105_000_000 + 16_180_000));
    }

    #[test]
    fn breakout_without_volume_is_silent() {
        let params = BreakoutParams::default();
        // 1.5x average volume: above average, below the 1.618 gate.
        let bars = bars_with_final(106_000_000, 1500);
        assert!(params.signal(&bars, 20).is_none());
    }

    #[test]
    fn volume_without_breakout_is_silent() {
        let params = BreakoutParams::default();
        let bars = bars_with_final(104_000_000, 5000);
        assert!(params.signal(&bars, 20).is_none());
    }

    #[test]
    fn short_breakdown_with_volume() {
        let params = BreakoutParams::default();
        let bars = bars_with_final(94_000_000, 3000);
        let signal = params.signal(&bars, 20).unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.stop_hint, Some(95_000_000 + 1_900_000));
    }

    #[test]
    fn channel_excludes_current_bar() {
        let params = BreakoutParams::default();
        // The breakout bar's own high must not raise the channel it is
        // breaking out of.
        let bars = bars_with_final(110_000_000, 2000);
        let signal = params.signal(&bars, 20).unwrap();
        match signal.context {
            SignalContext::Breakout { channel_high, .. } => {
                assert_eq!(channel_high, 105_000_000)
            }
            other => panic!("wrong context: {other:?}"),
        }
    }

    #[test]
    fn warmup_guard() {
        let params = BreakoutParams::default();
        let bars = bars_with_final(110_000_000, 2000);
        assert!(params.signal(&bars, 10).is_none());
    }

    #[test]
    fn rejects_bad_params() {
        let mut params = BreakoutParams::default();
        params.volume_multiplier = 0;
        assert!(params.validate().is_err());

        let mut params = BreakoutParams::default();
        params.lookback = 0;
        assert!(params.validate().is_err());
    }
}
