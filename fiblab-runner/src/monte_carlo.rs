//! Monte Carlo reordering of the trade sequence.
//!
//! The realized max drawdown depends heavily on the order trades happened
//! to arrive in. Shuffling the closed-trade P&Ls and replaying the
//! cumulative equity path many times gives a drawdown distribution — the
//! 95th percentile is a far safer planning number than the single realized
//! path.

use crate::bootstrap::{percentile, ValidationError, MIN_TRADES};
use fiblab_core::domain::Trade;
use fiblab_core::fixed::{to_f64, Cash, PRICE_SCALE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub paths: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Median max drawdown (dollars) across reordered paths.
    pub drawdown_p50: f64,
    /// 95th percentile max drawdown.
    pub drawdown_p95: f64,
    /// Worst observed path.
    pub drawdown_worst: f64,
    pub paths: usize,
    pub sample_size: usize,
}

/// Shuffle the trade sequence `paths` times and measure each path's max
/// drawdown from `initial_capital`.
pub fn reorder_drawdowns(
    trades: &[Trade],
    initial_capital: Cash,
    config: &MonteCarloConfig,
) -> Result<MonteCarloResult, ValidationError> {
    let n = trades.len();
    if n < MIN_TRADES {
        return Err(ValidationError::InsufficientTrades {
            sample_size: n,
            minimum: MIN_TRADES,
        });
    }

    let mut pnls: Vec<Cash> = trades.iter().map(|t| t.net_pnl).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut drawdowns = Vec::with_capacity(config.paths);

    for _ in 0..config.paths {
        pnls.shuffle(&mut rng);
        let mut equity = initial_capital;
        let mut peak = initial_capital;
        let mut worst: Cash = 0;
        for &pnl in &pnls {
            equity += pnl;
            peak = peak.max(equity);
            worst = worst.max(peak - equity);
        }
        drawdowns.push(to_f64(worst, PRICE_SCALE));
    }
    drawdowns.sort_by(|a, b| a.partial_cmp(b).unwrap());

    Ok(MonteCarloResult {
        drawdown_p50: percentile(&drawdowns, 0.50),
        drawdown_p95: percentile(&drawdowns, 0.95),
        drawdown_worst: drawdowns.last().copied().unwrap_or(0.0),
        paths: config.paths,
        sample_size: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fiblab_core::domain::{Direction, ExitReason, SignalContext};

    fn make_trade(net_pnl: Cash) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Trade {
            symbol: "SPY".into(),
            side: Direction::Long,
            quantity: 10,
            entry_bar: 0,
            entry_date: date,
            entry_price: 100_000_000,
            exit_bar: 3,
            exit_date: date,
            exit_price: 100_000_000,
            gross_pnl: net_pnl,
            commission: 0,
            slippage: 0,
            net_pnl,
            bars_held: 3,
            exit_reason: ExitReason::Stop,
            strategy: "breakout".into(),
            entry_context: SignalContext::Breakout {
                channel_high: 100_000_000,
                channel_low: 90_000_000,
                volume_ratio: 2_000_000,
            },
        }
    }

    fn mixed_ledger() -> Vec<Trade> {
        (0..60)
            .map(|i| {
                if i % 2 == 0 {
                    make_trade(300_000_000)
                } else {
                    make_trade(-250_000_000)
                }
            })
            .collect()
    }

    #[test]
    fn rejects_thin_ledgers() {
        let trades: Vec<Trade> = (0..5).map(|_| make_trade(1_000_000)).collect();
        assert!(reorder_drawdowns(&trades, 100_000_000_000, &MonteCarloConfig::default())
            .is_err());
    }

    #[test]
    fn percentiles_are_ordered() {
        let result = reorder_drawdowns(
            &mixed_ledger(),
            100_000_000_000,
            &MonteCarloConfig::default(),
        )
        .unwrap();
        assert!(result.drawdown_p50 <= result.drawdown_p95);
        assert!(result.drawdown_p95 <= result.drawdown_worst);
        // With 30 losers of $250 in the pool, some drawdown must exist.
        assert!(result.drawdown_p50 > 0.0);
    }

    #[test]
    fn seeded_runs_reproduce() {
        let config = MonteCarloConfig::default();
        let a = reorder_drawdowns(&mixed_ledger(), 100_000_000_000, &config).unwrap();
        let b = reorder_drawdowns(&mixed_ledger(), 100_000_000_000, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn all_winning_ledger_has_minimal_drawdown() {
        let trades: Vec<Trade> = (0..40).map(|_| make_trade(100_000_000)).collect();
        let result =
            reorder_drawdowns(&trades, 100_000_000_000, &MonteCarloConfig::default()).unwrap();
        assert_eq!(result.drawdown_worst, 0.0);
    }
}
