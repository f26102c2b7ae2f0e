//! Mean-reversion signal with golden-ratio bands.
//!
//! Entry when price stretches 1.618 sample standard deviations from the
//! rolling mean; the reversion exit fires once price is back within 0.382
//! standard deviations on the entry side.

use crate::domain::{Bar, Direction, ExitReason, Position, Signal, SignalContext};
use crate::error::ConfigError;
use crate::fixed::{Frac, FRAC_SCALE};
use crate::indicators::{rolling_mean, rolling_std};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionParams {
    pub lookback: usize,
    /// Entry threshold in standard deviations, at FRAC_SCALE.
    pub entry_threshold: Frac,
    /// Exit threshold in standard deviations, at FRAC_SCALE.
    pub exit_threshold: Frac,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            lookback: 20,
            entry_threshold: 1_618_000,
            exit_threshold: 382_000,
        }
    }
}

impl MeanReversionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::StrategyParam {
            name: "mean_reversion",
            reason,
        };
        if self.lookback < 2 {
            return Err(fail(format!("lookback must be >= 2, got {}", self.lookback)));
        }
        if self.entry_threshold <= 0 {
            return Err(fail("entry_threshold must be positive".into()));
        }
        if !(0 <= self.exit_threshold && self.exit_threshold < self.entry_threshold) {
            return Err(fail("requires 0 <= exit_threshold < entry_threshold".into()));
        }
        Ok(())
    }

    /// Signed z-score of the close at `index`, at FRAC_SCALE. None while
    /// warming up or when the window has zero deviation.
    fn z_score(&self, bars: &[Bar], index: usize) -> Option<(Frac, i64, i64)> {
        if index + 1 < self.lookback {
            return None;
        }
        let closes: Vec<_> = bars[..=index].iter().map(|b| b.close).collect();
        let mean = rolling_mean(&closes, self.lookback)[index]?;
        let std = rolling_std(&closes, self.lookback)[index]?;
        if std == 0 {
            return None;
        }
        let close = bars[index].close;
        let z = ((close as i128 - mean as i128) * FRAC_SCALE as i128 / std as i128) as Frac;
        Some((z, mean, std))
    }

    pub fn signal(&self, bars: &[Bar], index: usize) -> Option<Signal> {
        if index < self.lookback {
            return None;
        }
        let (z, mean, std) = self.z_score(bars, index)?;

        let context = SignalContext::MeanReversion {
            z_score: z,
            mean,
            std_dev: std,
        };
        // Conviction grows with the stretch, capped at 3 sigma.
        let strength = (z.abs() / 3).clamp(0, FRAC_SCALE);

        if z <= -self.entry_threshold {
            return Some(Signal {
                bar_index: index,
                direction: Direction::Long,
                strength,
                entry_hint: bars[index].close,
                stop_hint: None,
                target_hint: Some(mean),
                context,
            });
        }
        if z >= self.entry_threshold {
            return Some(Signal {
                bar_index: index,
                direction: Direction::Short,
                strength,
                entry_hint: bars[index].close,
                stop_hint: None,
                target_hint: Some(mean),
                context,
            });
        }
        None
    }

    /// Reversion exit: the stretch that justified the entry has closed.
    pub fn check_exit(
        &self,
        bars: &[Bar],
        index: usize,
        position: &Position,
    ) -> Option<ExitReason> {
        let (z, _, _) = self.z_score(bars, index)?;
        let reverted = match position.side {
            Direction::Long => z >= -self.exit_threshold,
            Direction::Short => z <= self.exit_threshold,
        };
        if reverted {
            Some(ExitReason::SignalReversal)
        } else {
            None
        }
    }
}
