//! Risk manager — turns a raw signal into a sized, validated order.
//!
//! `size_and_validate` either returns an `Order` or an explicit
//! `Rejection`. Rejections are per-signal and non-fatal: the engine logs
//! them as diagnostics and the bar continues.

pub mod kelly;

use crate::config::{RiskConfig, SizingPolicy};
use crate::domain::{Bar, Direction, Order, Signal, Trade};
use crate::fixed::{div_frac, mul_frac, notional, Cash, Frac, Price, Qty};
use crate::indicators::atr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use kelly::kelly_fraction;

/// Why a signal did not become an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("insufficient capital: need {required}, have {available}")]
    InsufficientCapital { required: Cash, available: Cash },

    #[error("portfolio heat {projected} would exceed ceiling {ceiling}")]
    HeatCeilingExceeded { projected: Frac, ceiling: Frac },

    #[error("reward:risk {achieved} below minimum {minimum}")]
    RewardRiskBelowMinimum { achieved: Frac, minimum: Frac },

    #[error("max concurrent positions reached ({open}/{limit})")]
    MaxPositionsReached { open: usize, limit: usize },

    #[error("sized quantity rounded to zero shares")]
    ZeroQuantity,
}

/// The slice of portfolio state the risk manager is allowed to see.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioView {
    pub equity: Cash,
    pub cash: Cash,
    /// Total capital at risk across open positions.
    pub open_risk: Cash,
    pub open_positions: usize,
}

/// Trailing trade statistics feeding the Kelly sizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeStats {
    pub closed: usize,
    pub win_rate: Frac,
    pub avg_win: Cash,
    pub avg_loss: Cash,
}

impl TradeStats {
    /// Statistics over the most recent `window` closed trades.
    pub fn from_trades(trades: &[Trade], window: usize) -> Self {
        let start = trades.len().saturating_sub(window);
        let recent = &trades[start..];
        if recent.is_empty() {
            return Self::default();
        }
        let winners: Vec<Cash> = recent
            .iter()
            .filter(|t| t.net_pnl > 0)
            .map(|t| t.net_pnl)
            .collect();
        let losers: Vec<Cash> = recent
            .iter()
            .filter(|t| t.net_pnl < 0)
            .map(|t| t.net_pnl.abs())
            .collect();
        let avg = |v: &[Cash]| {
            if v.is_empty() {
                0
            } else {
                (v.iter().map(|&x| x as i128).sum::<i128>() / v.len() as i128) as Cash
            }
        };
        Self {
            closed: recent.len(),
            win_rate: div_frac(winners.len() as i64, recent.len() as i64),
            avg_win: avg(&winners),
            avg_loss: avg(&losers),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    /// Config is validated upstream (`RiskConfig::validate`).
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Size a signal into an order, or reject it.
    pub fn size_and_validate(
        &self,
        signal: &Signal,
        view: &PortfolioView,
        stats: &TradeStats,
        bars: &[Bar],
        index: usize,
    ) -> Result<Order, Rejection> {
        let cfg = &self.config;
        if view.open_positions >= cfg.max_open_positions {
            return Err(Rejection::MaxPositionsReached {
                open: view.open_positions,
                limit: cfg.max_open_positions,
            });
        }

        let entry = signal.entry_hint;
        let stop = self.stop_price(signal, bars, index);
        let risk_per_share = (entry - stop).abs();
        if risk_per_share == 0 {
            return Err(Rejection::ZeroQuantity);
        }

        // Target from the strategy hint, or derived from the stop distance
        // at the minimum reward:risk.
        let derived = entry + signal.direction.sign() * mul_frac(risk_per_share, cfg.min_reward_risk);
        let target = signal.target_hint.unwrap_or(derived);
        let reward = signal.direction.sign() * (target - entry);
        let achieved = div_frac(reward, risk_per_share);
        if achieved < cfg.min_reward_risk {
            return Err(Rejection::RewardRiskBelowMinimum {
                achieved,
                minimum: cfg.min_reward_risk,
            });
        }

        let mut quantity = self.quantity(view.equity, entry, risk_per_share, stats);

        // Portfolio heat gate: down-size into the remaining headroom,
        // reject outright when none is left.
        let ceiling_cash = mul_frac(view.equity, cfg.heat_ceiling);
        let candidate_risk = notional(quantity, risk_per_share);
        if view.open_risk + candidate_risk > ceiling_cash {
            let headroom = ceiling_cash - view.open_risk;
            let projected = div_frac(view.open_risk + candidate_risk, view.equity);
            if headroom <= 0 {
                return Err(Rejection::HeatCeilingExceeded {
                    projected,
                    ceiling: cfg.heat_ceiling,
                });
            }
            quantity = headroom / risk_per_share;
            if quantity <= 0 {
                return Err(Rejection::HeatCeilingExceeded {
                    projected,
                    ceiling: cfg.heat_ceiling,
                });
            }
        }

        if quantity <= 0 {
            return Err(Rejection::ZeroQuantity);
        }

        let required = notional(quantity, entry);
        if required > view.cash {
            return Err(Rejection::InsufficientCapital {
                required,
                available: view.cash,
            });
        }

        Ok(Order {
            direction: signal.direction,
            quantity,
            entry,
            stop,
            target,
            signal_index: signal.bar_index,
            context: signal.context,
        })
    }

    /// Stop price: the wider of the fixed percentage stop and the
    /// structural stop (strategy hint, else ATR multiple).
    fn stop_price(&self, signal: &Signal, bars: &[Bar], index: usize) -> Price {
        let cfg = &self.config;
        let entry = signal.entry_hint;
        let pct_stop = entry - signal.direction.sign() * mul_frac(entry, cfg.stop_frac);

        let structural = signal.stop_hint.or_else(|| {
            let window = &bars[..=index];
            atr(window, cfg.atr_period)[index]
                .map(|a| entry - signal.direction.sign() * mul_frac(a, cfg.atr_stop_multiple))
        });

        let stop = match (signal.direction, structural) {
            (Direction::Long, Some(s)) => pct_stop.min(s),
            (Direction::Short, Some(s)) => pct_stop.max(s),
            (_, None) => pct_stop,
        };

        // A structural hint on the wrong side of entry falls back to the
        // percentage stop.
        if signal.direction.sign() * (entry - stop) <= 0 {
            pct_stop
        } else {
            stop
        }
    }

    /// Target capital allocation converted to whole shares.
    fn quantity(
        &self,
        equity: Cash,
        entry: Price,
        risk_per_share: Price,
        stats: &TradeStats,
    ) -> Qty {
        match self.config.sizing {
            SizingPolicy::FractionalKelly {
                divisor,
                fallback_risk,
                min_trades,
            } => {
                if stats.closed < min_trades {
                    return risk_quantity(equity, fallback_risk, risk_per_share);
                }
                let f = kelly_fraction(stats.win_rate, stats.avg_win, stats.avg_loss) / divisor;
                if f <= 0 {
                    return 0;
                }
                let allocation = mul_frac(equity, f);
                allocation / entry
            }
            SizingPolicy::FixedFractional { risk_frac } => {
                risk_quantity(equity, risk_frac, risk_per_share)
            }
        }
    }
}

fn risk_quantity(equity: Cash, risk_frac: Frac, risk_per_share: Price) -> Qty {
    if risk_per_share <= 0 {
        return 0;
    }
    mul_frac(equity, risk_frac) / risk_per_share
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalContext;
    use crate::fixed::PRICE_SCALE;

    fn long_signal(entry: Price, stop_hint: Option<Price>, target_hint: Option<Price>) -> Signal {
        Signal {
            bar_index: 30,
            direction: Direction::Long,
            strength: 618_000,
            entry_hint: entry,
            stop_hint,
            target_hint,
            context: SignalContext::Breakout {
                channel_high: entry,
                channel_low: entry / 2,
                volume_ratio: 2_000_000,
            },
        }
    }

    fn flat_view(equity: Cash) -> PortfolioView {
        PortfolioView {
            equity,
            cash: equity,
            open_risk: 0,
            open_positions: 0,
        }
    }

    fn kelly_stats() -> TradeStats {
        TradeStats {
            closed: 20,
            win_rate: 550_000,
            avg_win: 20_000,
            avg_loss: 10_000,
        }
    }

    fn manager(sizing: SizingPolicy) -> RiskManager {
        RiskManager::new(RiskConfig {
            sizing,
            ..Default::default()
        })
    }

    #[test]
    fn half_kelly_reference_sizing() {
        // $10,000 account, $50 entry, 55%/2:1 stats -> half-Kelly 16.25%
        // -> $1,625 allocation -> 32 shares (floor of 32.5).
        let rm = manager(SizingPolicy::FractionalKelly {
            divisor: 2,
            fallback_risk: 10_000,
            min_trades: 10,
        });
        let signal = long_signal(50 * PRICE_SCALE, Some(47 * PRICE_SCALE), None);
        let view = flat_view(10_000 * PRICE_SCALE);
        let order = rm
            .size_and_validate(&signal, &view, &kelly_stats(), &[], 0)
            .unwrap();
        assert_eq!(order.quantity, 32);
    }

    #[test]
    fn kelly_falls_back_until_enough_trades() {
        let rm = manager(SizingPolicy::FractionalKelly {
            divisor: 2,
            fallback_risk: 10_000,
            min_trades: 10,
        });
        let signal = long_signal(50 * PRICE_SCALE, Some(47 * PRICE_SCALE), None);
        let view = flat_view(10_000 * PRICE_SCALE);
        let stats = TradeStats {
            closed: 3,
            ..kelly_stats()
        };
        let order = rm.size_and_validate(&signal, &view, &stats, &[], 0).unwrap();
        // Fixed-fractional 1% of 10k = $100 risk over $3 risk/share = 33.
        assert_eq!(order.quantity, 33);
    }

    #[test]
    fn fixed_fractional_sizing() {
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 10_000 });
        // 5% pct stop is wider than the hint, so stop = hint 95.
        let signal = long_signal(100 * PRICE_SCALE, Some(96 * PRICE_SCALE), None);
        let view = flat_view(100_000 * PRICE_SCALE);
        let order = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap();
        // Stop: min(95, 96) = 95 -> $5 risk/share; 1% of 100k = $1000 -> 200.
        assert_eq!(order.stop, 95 * PRICE_SCALE);
        assert_eq!(order.quantity, 200);
    }

    #[test]
    fn heat_gate_downsizes_into_headroom() {
        // Ceiling 6%, 5.5% already at risk: a 1%-risk candidate is cut to
        // the remaining 0.5%.
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 10_000 });
        let equity = 100_000 * PRICE_SCALE;
        let view = PortfolioView {
            equity,
            cash: equity,
            open_risk: mul_frac(equity, 55_000),
            open_positions: 2,
        };
        let signal = long_signal(100 * PRICE_SCALE, Some(95 * PRICE_SCALE), None);
        let order = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap();
        // Full size would be 200 shares ($1000 risk); headroom is $500.
        assert_eq!(order.quantity, 100);
        assert_eq!(order.total_risk(), mul_frac(equity, 5_000));
    }

    #[test]
    fn heat_gate_rejects_with_no_headroom() {
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 10_000 });
        let equity = 100_000 * PRICE_SCALE;
        let view = PortfolioView {
            equity,
            cash: equity,
            open_risk: mul_frac(equity, 60_000),
            open_positions: 2,
        };
        let signal = long_signal(100 * PRICE_SCALE, Some(95 * PRICE_SCALE), None);
        let err = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap_err();
        assert!(matches!(err, Rejection::HeatCeilingExceeded { .. }));
    }

    #[test]
    fn reward_risk_gate() {
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 10_000 });
        // Stop $5 below, target only $5 above: 1:1 < 1.618 minimum.
        let signal = long_signal(
            100 * PRICE_SCALE,
            Some(95 * PRICE_SCALE),
            Some(105 * PRICE_SCALE),
        );
        let view = flat_view(100_000 * PRICE_SCALE);
        let err = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::RewardRiskBelowMinimum {
                achieved: 1_000_000,
                minimum: 1_618_000,
            }
        );
    }

    #[test]
    fn derived_target_meets_minimum_exactly() {
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 10_000 });
        let signal = long_signal(100 * PRICE_SCALE, Some(95 * PRICE_SCALE), None);
        let view = flat_view(100_000 * PRICE_SCALE);
        let order = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap();
        // Target = entry + 1.618 * $5 = 108.09.
        assert_eq!(order.target, 108_090_000);
    }

    #[test]
    fn max_positions_rejection() {
        let rm = manager(SizingPolicy::default());
        let signal = long_signal(100 * PRICE_SCALE, Some(95 * PRICE_SCALE), None);
        let view = PortfolioView {
            equity: 100_000 * PRICE_SCALE,
            cash: 100_000 * PRICE_SCALE,
            open_risk: 0,
            open_positions: 5,
        };
        let err = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap_err();
        assert_eq!(err, Rejection::MaxPositionsReached { open: 5, limit: 5 });
    }

    #[test]
    fn insufficient_capital_rejection() {
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 500_000 });
        // 50% risk sizing wants far more notional than cash on hand.
        let signal = long_signal(100 * PRICE_SCALE, Some(99 * PRICE_SCALE), None);
        let view = PortfolioView {
            equity: 100_000 * PRICE_SCALE,
            cash: 1_000 * PRICE_SCALE,
            open_risk: 0,
            open_positions: 0,
        };
        let err = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap_err();
        assert!(matches!(err, Rejection::InsufficientCapital { .. }));
    }

    #[test]
    fn short_stop_sits_above_entry() {
        let rm = manager(SizingPolicy::FixedFractional { risk_frac: 10_000 });
        let signal = Signal {
            direction: Direction::Short,
            stop_hint: Some(104 * PRICE_SCALE),
            ..long_signal(100 * PRICE_SCALE, None, None)
        };
        let view = flat_view(100_000 * PRICE_SCALE);
        let order = rm
            .size_and_validate(&signal, &view, &TradeStats::default(), &[], 0)
            .unwrap();
        // max(pct stop 105, hint 104) = 105.
        assert_eq!(order.stop, 105 * PRICE_SCALE);
        assert!(order.target < order.entry);
    }

    #[test]
    fn trade_stats_from_ledger() {
        use crate::domain::{ExitReason, Trade};
        use chrono::NaiveDate;
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let trade = |pnl: Cash| Trade {
            symbol: "T".into(),
            side: Direction::Long,
            quantity: 1,
            entry_bar: 0,
            entry_date: date,
            entry_price: 100,
            exit_bar: 1,
            exit_date: date,
            exit_price: 100,
            gross_pnl: pnl,
            commission: 0,
            slippage: 0,
            net_pnl: pnl,
            bars_held: 1,
            exit_reason: ExitReason::Target,
            strategy: "t".into(),
            entry_context: SignalContext::Momentum {
                rsi: 0,
                macd: 0,
                signal_line: 0,
            },
        };
        let trades = vec![trade(20_000), trade(-10_000), trade(20_000), trade(-10_000)];
        let stats = TradeStats::from_trades(&trades, 50);
        assert_eq!(stats.closed, 4);
        assert_eq!(stats.win_rate, 500_000);
        assert_eq!(stats.avg_win, 20_000);
        assert_eq!(stats.avg_loss, 10_000);

        // Window restricts to the most recent trades.
        let stats = TradeStats::from_trades(&trades, 2);
        assert_eq!(stats.closed, 2);
    }
}
