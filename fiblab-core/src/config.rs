//! Validated engine and risk configuration.
//!
//! Every field has a default and a valid range; out-of-range values are
//! rejected at construction time, before the bar loop ever starts. All
//! monetary fields are scaled integers (see `fixed`).

use crate::error::ConfigError;
use crate::fixed::{Cash, Frac, FRAC_SCALE, PRICE_SCALE};
use serde::{Deserialize, Serialize};

/// When an approved entry order fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFill {
    /// At the signal bar's close.
    Close,
    /// Queued and filled at the next tradable bar's open.
    NextOpen,
}

/// Position sizing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Kelly fraction from trailing trade statistics, divided by `divisor`
    /// (2 = half-Kelly, 4 = quarter-Kelly). Until `min_trades` closed
    /// trades exist the sizer falls back to fixed-fractional at
    /// `fallback_risk`.
    FractionalKelly {
        divisor: i64,
        fallback_risk: Frac,
        min_trades: usize,
    },
    /// Risk a fixed fraction of equity against the stop distance.
    FixedFractional { risk_frac: Frac },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::FixedFractional { risk_frac: 10_000 }
    }
}

/// Risk manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub sizing: SizingPolicy,
    /// Fixed percentage stop distance from entry.
    pub stop_frac: Frac,
    /// ATR period for the structural stop.
    pub atr_period: usize,
    /// Structural stop distance as a multiple of ATR, at FRAC_SCALE
    /// (2_000_000 = 2x ATR).
    pub atr_stop_multiple: Frac,
    /// Minimum acceptable reward:risk, at FRAC_SCALE.
    pub min_reward_risk: Frac,
    /// Portfolio heat ceiling: total capital at risk over equity.
    pub heat_ceiling: Frac,
    pub max_open_positions: usize,
    /// Closed trades feeding the trailing Kelly statistics.
    pub stats_window: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            sizing: SizingPolicy::default(),
            stop_frac: 50_000, // 5%
            atr_period: 14,
            atr_stop_multiple: 2_000_000,
            min_reward_risk: 1_618_000,
            heat_ceiling: 60_000, // 6%
            max_open_positions: 5,
            stats_window: 50,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.sizing {
            SizingPolicy::FractionalKelly {
                divisor,
                fallback_risk,
                ..
            } => {
                if divisor < 1 {
                    return Err(ConfigError::KellyDivisorOutOfRange(divisor));
                }
                if !(0 < fallback_risk && fallback_risk < FRAC_SCALE) {
                    return Err(ConfigError::RiskFracOutOfRange(fallback_risk));
                }
            }
            SizingPolicy::FixedFractional { risk_frac } => {
                if !(0 < risk_frac && risk_frac < FRAC_SCALE) {
                    return Err(ConfigError::RiskFracOutOfRange(risk_frac));
                }
            }
        }
        if !(0 < self.stop_frac && self.stop_frac < FRAC_SCALE) {
            return Err(ConfigError::StopFracOutOfRange(self.stop_frac));
        }
        if self.atr_period < 1 {
            return Err(ConfigError::ZeroAtrPeriod);
        }
        if !(0 < self.heat_ceiling && self.heat_ceiling < FRAC_SCALE) {
            return Err(ConfigError::HeatCeilingOutOfRange(self.heat_ceiling));
        }
        if self.min_reward_risk < FRAC_SCALE {
            return Err(ConfigError::RewardRiskOutOfRange(self.min_reward_risk));
        }
        if self.max_open_positions < 1 {
            return Err(ConfigError::NoPositionCapacity);
        }
        Ok(())
    }
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: Cash,
    /// Commission as a fraction of notional, per fill.
    pub commission: Frac,
    /// Slippage as a fraction of the fill price, applied against the trader.
    pub slippage: Frac,
    pub entry_fill: EntryFill,
    /// Gaps past a trigger larger than this fraction fill at the gap price
    /// (the open) instead of the trigger price. Zero means any gap does.
    pub gap_threshold: Frac,
    /// Optional trailing stop: ratchet distance from the highest favorable
    /// price.
    pub trailing_stop: Option<Frac>,
    pub risk: RiskConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000 * PRICE_SCALE,
            commission: 1_000, // 0.1%
            slippage: 1_000,   // 0.1%
            entry_fill: EntryFill::Close,
            gap_threshold: 0,
            trailing_stop: None,
            risk: RiskConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= 0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if !(0..FRAC_SCALE).contains(&self.commission) {
            return Err(ConfigError::CommissionOutOfRange(self.commission));
        }
        if !(0..FRAC_SCALE).contains(&self.slippage) {
            return Err(ConfigError::SlippageOutOfRange(self.slippage));
        }
        if !(0..FRAC_SCALE).contains(&self.gap_threshold) {
            return Err(ConfigError::GapThresholdOutOfRange(self.gap_threshold));
        }
        if let Some(trail) = self.trailing_stop {
            if !(0 < trail && trail < FRAC_SCALE) {
                return Err(ConfigError::TrailingStopOutOfRange(trail));
            }
        }
        self.risk.validate()
    }
}
