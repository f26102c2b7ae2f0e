//! Performance metrics — pure functions over the equity curve and trade
//! ledger.
//!
//! Recomputable at any time from the same immutable inputs with identical
//! results. Monetary outputs stay scaled integers; the dimensionless ratio
//! statistics (Sharpe, Sortino, Calmar) are computed in `f64` here, after
//! the run — the simulation loop itself never touches floats.

use fiblab_core::domain::{EquityPoint, Trade};
use fiblab_core::fixed::{div_frac, to_f64, Cash, Frac, PRICE_SCALE};
use fiblab_core::sequences::SequenceTables;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Maximum drawdown with its exact integer amount and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxDrawdown {
    /// Peak-to-trough equity loss.
    pub amount: Cash,
    /// Loss as a fraction of the peak, at FRAC_SCALE.
    pub fraction: Frac,
    pub peak_index: usize,
    pub trough_index: usize,
}

impl MaxDrawdown {
    fn zero() -> Self {
        Self {
            amount: 0,
            fraction: 0,
            peak_index: 0,
            trough_index: 0,
        }
    }
}

/// Aggregate performance metrics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: Cash,
    pub total_return_frac: Frac,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: MaxDrawdown,

    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Winning trades over total, at FRAC_SCALE.
    pub win_rate: Frac,
    pub profit_factor: f64,
    /// `win_rate * avg_win - (1 - win_rate) * |avg_loss|`.
    pub expectancy: Cash,
    pub avg_win: Cash,
    pub avg_loss: Cash,
    pub largest_win: Cash,
    pub largest_loss: Cash,
    pub avg_bars_held: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    /// Zeckendorf fingerprints of the headline numbers, for compact
    /// learning-store records.
    pub encoded_sharpe: Vec<u32>,
    pub encoded_drawdown: Vec<u32>,
}

impl PerformanceMetrics {
    /// Compute all metrics. `risk_free_rate` is annual, as a plain float
    /// (e.g. 0.02).
    pub fn compute(equity: &[EquityPoint], trades: &[Trade], risk_free_rate: f64) -> Self {
        let curve: Vec<Cash> = equity.iter().map(|p| p.equity).collect();
        let returns = daily_returns(&curve);
        let dd = max_drawdown(&curve);
        let sharpe = sharpe_ratio(&returns, risk_free_rate);
        let trading_days = curve.len();

        let winners: Vec<Cash> = trades
            .iter()
            .filter(|t| t.net_pnl > 0)
            .map(|t| t.net_pnl)
            .collect();
        let losers: Vec<Cash> = trades
            .iter()
            .filter(|t| t.net_pnl < 0)
            .map(|t| t.net_pnl)
            .collect();
        let win_rate = if trades.is_empty() {
            0
        } else {
            div_frac(winners.len() as i64, trades.len() as i64)
        };
        let avg_win = mean_cash(&winners);
        let avg_loss = mean_cash(&losers);

        let tables = SequenceTables::global();
        let encoded_sharpe = if sharpe > 0.0 {
            tables.zeckendorf((sharpe * 1000.0) as u64)
        } else {
            Vec::new()
        };
        let encoded_drawdown = if dd.amount > 0 {
            tables.zeckendorf(dd.amount as u64 / PRICE_SCALE as u64)
        } else {
            Vec::new()
        };

        Self {
            total_return: total_return(&curve),
            total_return_frac: total_return_frac(&curve),
            cagr: cagr(&curve, trading_days),
            sharpe,
            sortino: sortino_ratio(&returns, risk_free_rate),
            calmar: calmar_ratio(&curve, trading_days),
            max_drawdown: dd,
            trade_count: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate,
            profit_factor: profit_factor(trades),
            expectancy: expectancy(win_rate, avg_win, avg_loss),
            avg_win,
            avg_loss,
            largest_win: winners.iter().copied().max().unwrap_or(0),
            largest_loss: losers.iter().copied().min().unwrap_or(0),
            avg_bars_held: if trades.is_empty() {
                0.0
            } else {
                trades.iter().map(|t| t.bars_held).sum::<usize>() as f64 / trades.len() as f64
            },
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            encoded_sharpe,
            encoded_drawdown,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Final minus initial equity.
pub fn total_return(curve: &[Cash]) -> Cash {
    match (curve.first(), curve.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0,
    }
}

/// Total return as a fraction of initial equity, at FRAC_SCALE.
pub fn total_return_frac(curve: &[Cash]) -> Frac {
    match (curve.first(), curve.last()) {
        (Some(&first), Some(&last)) if first > 0 => div_frac(last - first, first),
        _ => 0,
    }
}

/// Compound annual growth rate, assuming 252 bars per year.
pub fn cagr(curve: &[Cash], trading_days: usize) -> f64 {
    if curve.len() < 2 || trading_days < 2 {
        return 0.0;
    }
    let initial = to_f64(curve[0], PRICE_SCALE);
    let final_eq = to_f64(*curve.last().unwrap(), PRICE_SCALE);
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe: `sqrt(252) * (mean(r) - rf_daily) / std(r)`.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino: denominator uses only downside deviation.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);

    let downside_sq: Vec<f64> = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    if downside_sq.is_empty() {
        return 0.0;
    }
    let downside_std = (downside_sq.iter().sum::<f64>() / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean / downside_std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calmar: CAGR over the magnitude of max drawdown.
pub fn calmar_ratio(curve: &[Cash], trading_days: usize) -> f64 {
    let c = cagr(curve, trading_days);
    let dd = max_drawdown(curve);
    if dd.fraction == 0 || c <= 0.0 {
        return 0.0;
    }
    c / to_f64(dd.fraction, fiblab_core::fixed::FRAC_SCALE)
}

/// Exact integer max drawdown with peak/trough indices.
pub fn max_drawdown(curve: &[Cash]) -> MaxDrawdown {
    if curve.len() < 2 {
        return MaxDrawdown::zero();
    }
    let mut peak = curve[0];
    let mut peak_index = 0;
    let mut best = MaxDrawdown::zero();

    for (i, &eq) in curve.iter().enumerate() {
        if eq > peak {
            peak = eq;
            peak_index = i;
        }
        let amount = peak - eq;
        if amount > best.amount && peak > 0 {
            best = MaxDrawdown {
                amount,
                fraction: div_frac(amount, peak),
                peak_index,
                trough_index: i,
            };
        }
    }
    best
}

/// Gross profit over gross loss, capped at 100.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: i128 = trades
        .iter()
        .filter(|t| t.net_pnl > 0)
        .map(|t| t.net_pnl as i128)
        .sum();
    let gross_loss: i128 = trades
        .iter()
        .filter(|t| t.net_pnl < 0)
        .map(|t| (-t.net_pnl) as i128)
        .sum();

    if gross_loss == 0 {
        return if gross_profit > 0 { 100.0 } else { 0.0 };
    }
    (gross_profit as f64 / gross_loss as f64).min(100.0)
}

/// `win_rate * avg_win - (1 - win_rate) * |avg_loss|`, in cash units.
pub fn expectancy(win_rate: Frac, avg_win: Cash, avg_loss: Cash) -> Cash {
    use fiblab_core::fixed::{mul_frac, FRAC_SCALE};
    mul_frac(avg_win, win_rate) - mul_frac(avg_loss.abs(), FRAC_SCALE - win_rate)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Per-bar fractional returns from an equity curve.
pub fn daily_returns(curve: &[Cash]) -> Vec<f64> {
    if curve.len() < 2 {
        return Vec::new();
    }
    curve
        .windows(2)
        .map(|w| {
            if w[0] > 0 {
                (w[1] - w[0]) as f64 / w[0] as f64
            } else {
                0.0
            }
        })
        .collect()
}

fn mean_cash(values: &[Cash]) -> Cash {
    if values.is_empty() {
        return 0;
    }
    (values.iter().map(|&v| v as i128).sum::<i128>() / values.len() as i128) as Cash
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
