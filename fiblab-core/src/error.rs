//! Error taxonomy.
//!
//! Two fatal families: data-integrity failures (abort the run with the
//! offending bar index) and configuration failures (caught before the loop
//! starts). Per-signal risk rejections and execution anomalies are not
//! errors — they accumulate in the run's diagnostics (see `engine::state`).

use crate::fixed::{Cash, Frac};
use chrono::NaiveDate;
use thiserror::Error;

/// Fatal data-integrity failure. Always names the offending bar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("empty bar series for {symbol}")]
    EmptySeries { symbol: String },

    #[error("bar {index}: date {date} does not increase over {prev}")]
    NonIncreasingDate {
        index: usize,
        date: NaiveDate,
        prev: NaiveDate,
    },

    #[error("bar {index}: invalid OHLC (requires 0 < low <= open,close <= high)")]
    InvalidOhlc { index: usize },

    #[error("split at bar {index} is out of range (series has {len} bars)")]
    SplitOutOfRange { index: usize, len: usize },

    #[error("split at bar {index} has a zero adjustment term")]
    InvalidSplit { index: usize },
}

/// Fatal configuration failure, rejected before the loop starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(Cash),

    #[error("commission must be in [0, 100%), got {0}")]
    CommissionOutOfRange(Frac),

    #[error("slippage must be in [0, 100%), got {0}")]
    SlippageOutOfRange(Frac),

    #[error("gap threshold must be in [0, 100%), got {0}")]
    GapThresholdOutOfRange(Frac),

    #[error("trailing stop must be in (0, 100%), got {0}")]
    TrailingStopOutOfRange(Frac),

    #[error("stop fraction must be in (0, 100%), got {0}")]
    StopFracOutOfRange(Frac),

    #[error("risk fraction must be in (0, 100%), got {0}")]
    RiskFracOutOfRange(Frac),

    #[error("portfolio heat ceiling must be in (0, 100%), got {0}")]
    HeatCeilingOutOfRange(Frac),

    #[error("Kelly divisor must be >= 1, got {0}")]
    KellyDivisorOutOfRange(i64),

    #[error("minimum reward:risk must be >= 100%, got {0}")]
    RewardRiskOutOfRange(Frac),

    #[error("max open positions must be >= 1")]
    NoPositionCapacity,

    #[error("ATR period must be >= 1")]
    ZeroAtrPeriod,

    #[error("no strategies configured")]
    NoStrategies,

    #[error("strategy `{name}`: {reason}")]
    StrategyParam { name: &'static str, reason: String },
}

/// Anything fatal a backtest run can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
