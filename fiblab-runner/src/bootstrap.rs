//! Bootstrap resampling of trade P&Ls.
//!
//! A single backtest yields one realization of the strategy's trade
//! distribution. Resampling the closed-trade P&Ls with replacement turns
//! the point estimate of expectancy into a confidence interval — required
//! before treating any single run as decision-grade.

use fiblab_core::domain::Trade;
use fiblab_core::fixed::{to_f64, PRICE_SCALE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum closed trades before a resampled interval means anything.
pub const MIN_TRADES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub resamples: usize,
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    /// Mean trade P&L (dollars) across resamples.
    pub expectancy_mean: f64,
    /// 5th/95th percentile of mean trade P&L.
    pub expectancy_ci: (f64, f64),
    /// 5th/95th percentile of total P&L per resampled ledger.
    pub total_pnl_ci: (f64, f64),
    pub resamples: usize,
    pub sample_size: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("insufficient trades: {sample_size} < minimum {minimum}")]
    InsufficientTrades { sample_size: usize, minimum: usize },
}

/// Resample trade net P&Ls with replacement and report percentile CIs.
pub fn bootstrap_trades(
    trades: &[Trade],
    config: &BootstrapConfig,
) -> Result<BootstrapResult, ValidationError> {
    let n = trades.len();
    if n < MIN_TRADES {
        return Err(ValidationError::InsufficientTrades {
            sample_size: n,
            minimum: MIN_TRADES,
        });
    }

    let pnls: Vec<f64> = trades
        .iter()
        .map(|t| to_f64(t.net_pnl, PRICE_SCALE))
        .collect();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut means = Vec::with_capacity(config.resamples);
    let mut totals = Vec::with_capacity(config.resamples);
    for _ in 0..config.resamples {
        let total: f64 = (0..n).map(|_| pnls[rng.gen_range(0..n)]).sum();
        totals.push(total);
        means.push(total / n as f64);
    }
    means.sort_by(|a, b| a.partial_cmp(b).unwrap());
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap());

    Ok(BootstrapResult {
        expectancy_mean: crate::metrics::mean_f64(&means),
        expectancy_ci: (percentile(&means, 0.05), percentile(&means, 0.95)),
        total_pnl_ci: (percentile(&totals, 0.05), percentile(&totals, 0.95)),
        resamples: config.resamples,
        sample_size: n,
    })
}

/// Percentile of a sorted slice by nearest-rank.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64) * q).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fiblab_core::domain::{Direction, ExitReason, SignalContext};
    use fiblab_core::fixed::Cash;

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
            exit_reason: ExitReason::Target,
            strategy: "breakout".into(),
            entry_context: SignalContext::Breakout {
                channel_high: 100_000_000,
                channel_low: 90_000_000,
                volume_ratio: 2_000_000,
            },
        }
    }

    fn ledger(n: usize) -> Vec<Trade> {
        (0..n)
            .map(|i| {
                // 60% winners of $200, 40% losers of $150.
                if i % 5 < 3 {
                    make_trade(200_000_000)
                } else {
                    make_trade(-150_000_000)
                }
            })
            .collect()
    }

    #[test]
    fn rejects_thin_ledgers() {
        let trades = ledger(10);
        let err = bootstrap_trades(&trades, &BootstrapConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientTrades {
                sample_size: 10,
                minimum: MIN_TRADES
            }
        );
    }

    #[test]
    fn interval_brackets_the_sample_mean() {
        let trades = ledger(100);
        let result = bootstrap_trades(&trades, &BootstrapConfig::default()).unwrap();
        // Sample expectancy: 0.6 * 200 - 0.4 * 150 = 60.
        assert!(result.expectancy_ci.0 < 60.0 && 60.0 < result.expectancy_ci.1);
        assert!(result.expectancy_ci.0 < result.expectancy_mean);
        assert!(result.expectancy_mean < result.expectancy_ci.1);
        assert_eq!(result.sample_size, 100);
    }

    #[test]
    fn same_seed_reproduces_exactly() {
        let trades = ledger(60);
        let config = BootstrapConfig::default();
        let a = bootstrap_trades(&trades, &config).unwrap();
        let b = bootstrap_trades(&trades, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let trades = ledger(60);
        let a = bootstrap_trades(&trades, &BootstrapConfig { seed: 1, ..Default::default() })
            .unwrap();
        let b = bootstrap_trades(&trades, &BootstrapConfig { seed: 2, ..Default::default() })
            .unwrap();
        assert_ne!(a.expectancy_ci, b.expectancy_ci);
    }

    #[test]
    fn percentile_nearest_rank() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&sorted, 0.05), 1.0);
        assert_eq!(percentile(&sorted, 0.50), 5.0);
        assert_eq!(percentile(&sorted, 0.95), 10.0);
    }
}
