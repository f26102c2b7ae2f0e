//! Fibonacci retracement signal.
//!
//! Over the trailing lookback window, find the swing high and swing low,
//! then the retracement prices at the standard ratios descending from the
//! high. A long fires when the close sits within `tolerance` of one of the
//! entry levels (deeper level = stronger signal; the closest level wins a
//! tie). A close within tolerance of the swing high itself is resistance
//! and fires a short.

use crate::domain::{Bar, Direction, Signal, SignalContext};
use crate::error::ConfigError;
use crate::fixed::{mul_frac, mul_ratio, Frac, Price, Ratio, FRAC_SCALE, RATIO_SCALE};
use crate::sequences::EXTENSION_RATIOS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetracementParams {
    /// Window for locating the swing high/low.
    pub lookback: usize,
    /// Ratios (at RATIO_SCALE) that act as entry supports.
    pub entry_ratios: Vec<Ratio>,
    /// How close (fraction of the level price) the close must be to count
    /// as a touch.
    pub tolerance: Frac,
    /// Structural stop distance below the swing low.
    pub stop_buffer: Frac,
}

impl Default for RetracementParams {
    fn default() -> Self {
        Self {
            lookback: 20,
            entry_ratios: vec![38_200_000, 50_000_000, 61_800_000],
            tolerance: 5_000, // 0.5%
            stop_buffer: 20_000,
        }
    }
}

impl RetracementParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::StrategyParam {
            name: "fibonacci_retracement",
            reason,
        };
        if self.lookback < 2 {
            return Err(fail(format!("lookback must be >= 2, got {}", self.lookback)));
        }
        if self.entry_ratios.is_empty() {
            return Err(fail("entry_ratios must not be empty".into()));
        }
        for &r in &self.entry_ratios {
            if !(0 < r && r < RATIO_SCALE) {
                return Err(fail(format!("entry ratio {r} outside (0, 1)")));
            }
        }
        if !(0 < self.tolerance && self.tolerance < FRAC_SCALE) {
            return Err(fail(format!("tolerance {} outside (0, 1)", self.tolerance)));
        }
        if !(0 <= self.stop_buffer && self.stop_buffer < FRAC_SCALE) {
            return Err(fail(format!("stop_buffer {} outside [0, 1)", self.stop_buffer)));
        }
        Ok(())
    }

    /// Swing high and low over `bars[index-lookback ..= index]`.
    fn swing_points(&self, bars: &[Bar], index: usize) -> (Price, Price) {
        let start = index.saturating_sub(self.lookback);
        let window = &bars[start..=index];
        let high = window.iter().map(|b| b.high).max().unwrap();
        let low = window.iter().map(|b| b.low).min().unwrap();
        (high, low)
    }

    pub fn signal(&self, bars: &[Bar], index: usize) -> Option<Signal> {
        if index < self.lookback {
            return None;
        }

        let bar = &bars[index];
        let close = bar.close;
        let (swing_high, swing_low) = self.swing_points(bars, index);
        let range = swing_high - swing_low;
        if range == 0 {
            return None;
        }

        // Closest entry level within tolerance wins.
        let mut best: Option<(Ratio, Price, Price)> = None; // (ratio, level_price, distance)
        for &ratio in &self.entry_ratios {
            let level_price = swing_high - mul_ratio(range, ratio);
            let distance = (close - level_price).abs();
            if distance <= mul_frac(level_price, self.tolerance) {
                let closer = match best {
                    Some((_, _, best_distance)) => distance < best_distance,
                    None => true,
                };
                if closer {
                    best = Some((ratio, level_price, distance));
                }
            }
        }

        if let Some((ratio, level_price, _)) = best {
            // Deeper retracement, stronger signal: 0.618 -> 0.618 strength.
            let strength = (ratio * FRAC_SCALE / RATIO_SCALE) as Frac;
            let stop_hint = swing_low - mul_frac(swing_low, self.stop_buffer);
            let target_hint = swing_low + mul_ratio(range, EXTENSION_RATIOS[1]);
            return Some(Signal {
                bar_index: index,
                direction: Direction::Long,
                strength,
                entry_hint: close,
                stop_hint: Some(stop_hint),
                target_hint: Some(target_hint),
                context: SignalContext::Retracement {
                    level: ratio,
                    level_price,
                    swing_high,
                    swing_low,
                },
            });
        }

        // Resistance: close at the swing high itself.
        if (swing_high - close).abs() <= mul_frac(swing_high, self.tolerance) {
            let stop_hint = swing_high + mul_frac(swing_high, self.stop_buffer);
            return Some(Signal {
                bar_index: index,
                direction: Direction::Short,
                strength: 800_000,
                entry_hint: close,
                stop_hint: Some(stop_hint),
                target_hint: None,
                context: SignalContext::Retracement {
                    level: RATIO_SCALE,
                    level_price: swing_high,
                    swing_high,
                    swing_low,
                },
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// A window whose swing high is 100 and swing low is 50, with the
    /// current close placed wherever the test wants it.
    fn bars_with_close(close: Price) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<Bar> = (0..21)
            .map(|i| Bar {
                date: base_date + chrono::Duration::days(i),
                open: 70_000_000,
                high: if i == 2 { 100_000_000 } else { 72_000_000 },
                low: if i == 5 { 50_000_000 } else { 68_000_000 },
                close: 70_000_000,
                volume: 1000,
            })
            .collect();
        let last = bars.last_mut().unwrap();
        last.close = close;
        last.high = last.high.max(close);
        last.low = last.low.min(close);
        bars
    }

    #[test]
    fn fires_long_at_golden_level() {
        // 0.618 level of the 100/50 swing = 69.100000.
        let params = RetracementParams::default();
        let bars = bars_with_close(69_100_000);
        let signal = params.signal(&bars, 20).unwrap();
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.strength, 618_000);
        match signal.context {
            SignalContext::Retracement {
                level, level_price, swing_high, swing_low,
            } => {
                assert_eq!(level, 61_800_000);
                assert_eq!(level_price, 69_100_000);
                assert_eq!(swing_high, 100_000_000);
                assert_eq!(swing_low, 50_000_000);
            }
            other => panic!("wrong context: {other:?}"),
        }
    }

    #[test]
    fn level_prices_match_expected_integers() {
        let params = RetracementParams::default();
        for (close, expected_level, expected_price) in [
            (69_100_000, 61_800_000, 69_100_000), // 0.618
            (75_000_000, 50_000_000, 75_000_000), // 0.500
            (80_900_000, 38_200_000, 80_900_000), // 0.382
        ] {
            let bars = bars_with_close(close);
            let signal = params.signal(&bars, 20).unwrap();
            match signal.context {
                SignalContext::Retracement { level, level_price, .. } => {
                    assert_eq!(level, expected_level);
                    assert_eq!(level_price, expected_price);
                }
                other => panic!("wrong context: {other:?}"),
            }
        }
    }

    #[test]
    fn closest_level_wins_tie() {
        // 72.05 sits between 0.500 (75.0) and 0.618 (69.1); with a huge
        // tolerance both match, the closer one (0.618 at distance 2.95 vs
        // 0.500 at 2.95... use 71.9: distances 2.8 vs 3.1) must win.
        let params = RetracementParams {
            tolerance: 100_000, // 10%
            ..Default::default()
        };
        let bars = bars_with_close(71_900_000);
        let signal = params.signal(&bars, 20).unwrap();
        match signal.context {
            SignalContext::Retracement { level, .. } => assert_eq!(level, 61_800_000),
            other => panic!("wrong context: {other:?}"),
        }
    }

    #[test]
    fn no_signal_outside_tolerance() {
        let params = RetracementParams::default();
        // 72.0 is >0.5% from every level and from the swing high.
        let bars = bars_with_close(72_000_000);
        assert!(params.signal(&bars, 20).is_none());
    }

    #[test]
    fn short_at_resistance() {
        let params = RetracementParams::default();
        let bars = bars_with_close(99_900_000);
        let signal = params.signal(&bars, 20).unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert!(signal.stop_hint.unwrap() > 100_000_000);
    }

    #[test]
    fn warmup_guard() {
        let params = RetracementParams::default();
        let bars = bars_with_close(69_100_000);
        assert!(params.signal(&bars, 5).is_none());
    }

    #[test]
    fn stop_and_target_hints() {
        let params = RetracementParams::default();
        let bars = bars_with_close(69_100_000);
        let signal = params.signal(&bars, 20).unwrap();
        // Stop 2% below the swing low; target at the 1.618 extension.
        assert_eq!(signal.stop_hint, Some(49_000_000));
        assert_eq!(signal.target_hint, Some(50_000_000 + 80_900_000));
    }

    #[test]
    fn rejects_bad_params() {
        let mut params = RetracementParams::default();
        params.lookback = 1;
        assert!(params.validate().is_err());

        let mut params = RetracementParams::default();
        params.entry_ratios.clear();
        assert!(params.validate().is_err());

        let mut params = RetracementParams::default();
        params.tolerance = FRAC_SCALE;
        assert!(params.validate().is_err());
    }
}
