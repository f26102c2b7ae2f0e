//! Strategy contract — five signal generators behind one closed enum.
//!
//! Strategies are portfolio-agnostic: `generate_signal` sees bar history and
//! the shared sequence tables, never cash or positions. All variants read
//! only `bars[..=index]`; the truncation tests enforce this.
//!
//! Exits are split in two: the engine owns stop/target triggers, while a
//! strategy may own additional exit rules (`check_exit`) for positions it
//! opened — the Lucas time stop and the mean-reversion reversion exit.

pub mod breakout;
pub mod fibonacci;
pub mod lucas_exit;
pub mod mean_reversion;
pub mod momentum;

use crate::domain::{Bar, ExitReason, Position, Signal};
use crate::error::ConfigError;
use crate::sequences::SequenceTables;
use serde::{Deserialize, Serialize};

pub use breakout::BreakoutParams;
pub use fibonacci::RetracementParams;
pub use lucas_exit::LucasExitParams;
pub use mean_reversion::MeanReversionParams;
pub use momentum::MomentumParams;

/// The closed set of strategy kinds, each with its own parameter struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    FibonacciRetracement(RetracementParams),
    LucasTimeExit(LucasExitParams),
    Momentum(MomentumParams),
    MeanReversion(MeanReversionParams),
    Breakout(BreakoutParams),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::FibonacciRetracement(_) => "fibonacci_retracement",
            Strategy::LucasTimeExit(_) => "lucas_time_exit",
            Strategy::Momentum(_) => "momentum",
            Strategy::MeanReversion(_) => "mean_reversion",
            Strategy::Breakout(_) => "breakout",
        }
    }

    /// Bars needed before this strategy can produce output.
    pub fn warmup_bars(&self) -> usize {
        match self {
            Strategy::FibonacciRetracement(p) => p.lookback,
            Strategy::LucasTimeExit(p) => p.atr_period,
            Strategy::Momentum(p) => p.warmup_bars(),
            Strategy::MeanReversion(p) => p.lookback,
            Strategy::Breakout(p) => p.lookback,
        }
    }

    /// An exit overlay generates no entries but its exit rule applies to
    /// every open position, whichever strategy opened it.
    pub fn is_exit_overlay(&self) -> bool {
        matches!(self, Strategy::LucasTimeExit(_))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Strategy::FibonacciRetracement(p) => p.validate(),
            Strategy::LucasTimeExit(p) => p.validate(),
            Strategy::Momentum(p) => p.validate(),
            Strategy::MeanReversion(p) => p.validate(),
            Strategy::Breakout(p) => p.validate(),
        }
    }

    /// Evaluate the strategy at `index`. Reads only `bars[..=index]`.
    /// Returns `None` when the strategy sees nothing (flat).
    pub fn generate_signal(
        &self,
        bars: &[Bar],
        index: usize,
        tables: &SequenceTables,
    ) -> Option<Signal> {
        let _ = tables;
        match self {
            Strategy::FibonacciRetracement(p) => p.signal(bars, index),
            Strategy::LucasTimeExit(_) => None,
            Strategy::Momentum(p) => p.signal(bars, index),
            Strategy::MeanReversion(p) => p.signal(bars, index),
            Strategy::Breakout(p) => p.signal(bars, index),
        }
    }

    /// Strategy-owned exit check for an open position. Reads only
    /// `bars[..=index]`.
    pub fn check_exit(
        &self,
        bars: &[Bar],
        index: usize,
        position: &Position,
        tables: &SequenceTables,
    ) -> Option<ExitReason> {
        match self {
            Strategy::LucasTimeExit(p) => p.check_exit(bars, index, position, tables),
            Strategy::MeanReversion(p) => p.check_exit(bars, index, position),
            _ => None,
        }
    }
}
