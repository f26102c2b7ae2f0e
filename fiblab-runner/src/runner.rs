//! Run orchestration: config -> data -> engine -> metrics -> validation.

use crate::bootstrap::{bootstrap_trades, BootstrapConfig, BootstrapResult};
use crate::config::{RunConfig, RunId};
use crate::data::load_series;
use crate::metrics::PerformanceMetrics;
use crate::monte_carlo::{reorder_drawdowns, MonteCarloConfig, MonteCarloResult};
use anyhow::Context;
use fiblab_core::engine::{run_backtest, RunResult};
use fiblab_core::series::BarSeries;
use std::sync::atomic::AtomicBool;

/// A completed run with its derived statistics.
#[derive(Debug)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub config: RunConfig,
    pub run: RunResult,
    pub metrics: PerformanceMetrics,
    pub bootstrap: Option<BootstrapResult>,
    pub monte_carlo: Option<MonteCarloResult>,
}

/// Load data per the config and run a single backtest.
pub fn run_single_backtest(config: &RunConfig) -> anyhow::Result<BacktestResult> {
    config.validate().context("invalid run configuration")?;
    let mut series = load_series(&config.data, &config.symbol)
        .with_context(|| format!("loading bars for {}", config.symbol))?;
    series
        .adjust_for_splits(&config.splits)
        .context("applying split adjustments")?;
    run_on_series(config, &series, None)
}

/// Run against an already-loaded series (sweeps share one load).
pub fn run_on_series(
    config: &RunConfig,
    series: &BarSeries,
    cancel: Option<&AtomicBool>,
) -> anyhow::Result<BacktestResult> {
    let run = run_backtest(series, &config.strategies, &config.engine, cancel)
        .context("backtest run failed")?;
    let metrics = PerformanceMetrics::compute(&run.equity_curve, &run.trades, 0.0);

    // Statistical validation is best-effort: a thin ledger simply reports
    // no interval rather than failing the run.
    let (bootstrap, monte_carlo) = match &config.validation {
        Some(v) => {
            let bootstrap_config = BootstrapConfig {
                resamples: v.resamples,
                seed: v.seed,
            };
            let mc_config = MonteCarloConfig {
                paths: v.resamples,
                seed: v.seed,
            };
            (
                bootstrap_trades(&run.trades, &bootstrap_config).ok(),
                reorder_drawdowns(&run.trades, config.engine.initial_capital, &mc_config).ok(),
            )
        }
        None => (None, None),
    };

    Ok(BacktestResult {
        run_id: config.run_id(),
        config: config.clone(),
        run,
        metrics,
        bootstrap,
        monte_carlo,
    })
}
