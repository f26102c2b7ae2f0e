//! Artifact export: metrics JSON, trades CSV, equity-curve CSV.

use crate::runner::BacktestResult;
use anyhow::Context;
use fiblab_core::fixed::format_price;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub metrics_json: PathBuf,
    pub trades_csv: PathBuf,
    pub equity_csv: PathBuf,
}

#[derive(Serialize)]
struct MetricsArtifact<'a> {
    run_id: &'a str,
    symbol: &'a str,
    bar_count: usize,
    signal_count: usize,
    rejection_count: usize,
    cancelled: bool,
    metrics: &'a crate::metrics::PerformanceMetrics,
    bootstrap: &'a Option<crate::bootstrap::BootstrapResult>,
    monte_carlo: &'a Option<crate::monte_carlo::MonteCarloResult>,
    diagnostics: &'a [fiblab_core::engine::Diagnostic],
}

/// Write all artifacts for a run under `dir/<run_id prefix>/`.
pub fn save_artifacts(result: &BacktestResult, dir: &Path) -> anyhow::Result<ArtifactPaths> {
    let run_dir = dir.join(&result.run_id[..16.min(result.run_id.len())]);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating {}", run_dir.display()))?;

    let metrics_json = run_dir.join("metrics.json");
    let artifact = MetricsArtifact {
        run_id: &result.run_id,
        symbol: &result.run.symbol,
        bar_count: result.run.bar_count,
        signal_count: result.run.signal_count,
        rejection_count: result.run.rejection_count(),
        cancelled: result.run.cancelled,
        metrics: &result.metrics,
        bootstrap: &result.bootstrap,
        monte_carlo: &result.monte_carlo,
        diagnostics: &result.run.diagnostics,
    };
    std::fs::write(&metrics_json, serde_json::to_string_pretty(&artifact)?)
        .with_context(|| format!("writing {}", metrics_json.display()))?;

    let trades_csv = run_dir.join("trades.csv");
    write_trades_csv(result, &trades_csv)?;

    let equity_csv = run_dir.join("equity.csv");
    write_equity_csv(result, &equity_csv)?;

    Ok(ArtifactPaths {
        metrics_json,
        trades_csv,
        equity_csv,
    })
}

fn write_trades_csv(result: &BacktestResult, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "entry_date",
        "exit_date",
        "side",
        "quantity",
        "entry_price",
        "exit_price",
        "net_pnl",
        "bars_held",
        "exit_reason",
        "strategy",
    ])?;
    for trade in &result.run.trades {
        writer.write_record([
            trade.entry_date.format("%Y-%m-%d").to_string(),
            trade.exit_date.format("%Y-%m-%d").to_string(),
            format!("{:?}", trade.side).to_lowercase(),
            trade.quantity.to_string(),
            format_price(trade.entry_price),
            format_price(trade.exit_price),
            format_price(trade.net_pnl),
            trade.bars_held.to_string(),
            serde_json::to_value(trade.exit_reason)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            trade.strategy.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_equity_csv(result: &BacktestResult, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["bar_index", "date", "cash", "equity", "drawdown"])?;
    for point in &result.run.equity_curve {
        writer.write_record([
            point.bar_index.to_string(),
            point.date.format("%Y-%m-%d").to_string(),
            format_price(point.cash),
            format_price(point.equity),
            point.drawdown.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
