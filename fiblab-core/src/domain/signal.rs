//! Signal — directional intent emitted by a strategy for one bar.
//!
//! Signals are ephemeral: the risk manager consumes them within the same
//! bar and they are never persisted. A strategy that sees nothing emits no
//! signal at all (`Option::None`), so "flat" never reaches the sizer.

use crate::fixed::{Frac, Price, Ratio};
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Multiplies into signed P&L math.
    pub fn sign(&self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Strategy-specific context attached to a signal.
///
/// A closed enum instead of a string-keyed map: every variant names exactly
/// the fields its strategy produces, and downstream code matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalContext {
    Retracement {
        /// The retracement ratio whose level was touched.
        level: Ratio,
        level_price: Price,
        swing_high: Price,
        swing_low: Price,
    },
    Momentum {
        /// RSI as a fraction (FRAC_SCALE = 100).
        rsi: Frac,
        macd: Price,
        signal_line: Price,
    },
    MeanReversion {
        /// Signed z-score at FRAC_SCALE.
        z_score: Frac,
        mean: Price,
        std_dev: Price,
    },
    Breakout {
        channel_high: Price,
        channel_low: Price,
        /// Bar volume over rolling average volume, at FRAC_SCALE.
        volume_ratio: Frac,
    },
}

/// A raw, unsized trade signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub bar_index: usize,
    pub direction: Direction,
    /// Conviction in [0, FRAC_SCALE].
    pub strength: Frac,
    /// Reference price for sizing (the signal bar's close).
    pub entry_hint: Price,
    /// Structural stop suggested by the strategy, if it has one.
    pub stop_hint: Option<Price>,
    /// Profit target suggested by the strategy, if it has one.
    pub target_hint: Option<Price>,
    pub context: SignalContext,
}
