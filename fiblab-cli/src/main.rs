//! fiblab CLI — run backtests and parameter sweeps.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file or a named preset
//! - `sweep` — evaluate the retracement-level grid and print a leaderboard

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fiblab_core::config::EngineConfig;
use fiblab_core::fixed::{to_f64, FRAC_SCALE, PRICE_SCALE};
use fiblab_core::strategy::{
    BreakoutParams, LucasExitParams, MeanReversionParams, MomentumParams, RetracementParams,
    Strategy,
};
use fiblab_runner::config::{DataConfig, RunConfig, ValidationConfig};
use fiblab_runner::learning::{flush_events, JsonlLearningStore};
use fiblab_runner::{
    render_report, retracement_level_grid, run_single_backtest, save_artifacts, sweep,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fiblab", about = "fiblab — Fibonacci-strategy backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or a named preset.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Named preset: retracement, momentum, mean-reversion, breakout,
        /// ensemble.
        #[arg(long)]
        preset: Option<String>,

        /// Symbol label for the run (required with --preset).
        #[arg(long)]
        symbol: Option<String>,

        /// CSV file with date,open,high,low,close,volume rows.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Bars of synthetic data when no CSV is given.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Bootstrap/Monte Carlo validation of the result.
        #[arg(long, default_value_t = false)]
        validate: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Append closed trades to this JSONL learning store.
        #[arg(long)]
        learning_store: Option<PathBuf>,
    },
    /// Evaluate the retracement-level grid and print a leaderboard.
    Sweep {
        /// Symbol label for the runs.
        #[arg(long, default_value = "SYN")]
        symbol: String,

        /// CSV file; falls back to synthetic data when absent.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Bars of synthetic data when no CSV is given.
        #[arg(long, default_value_t = 750)]
        bars: usize,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            preset,
            symbol,
            csv,
            bars,
            seed,
            validate,
            output_dir,
            learning_store,
        } => cmd_run(
            config,
            preset,
            symbol,
            csv,
            bars,
            seed,
            validate,
            output_dir,
            learning_store,
        ),
        Commands::Sweep {
            symbol,
            csv,
            bars,
            seed,
        } => cmd_sweep(symbol, csv, bars, seed),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    config_path: Option<PathBuf>,
    preset: Option<String>,
    symbol: Option<String>,
    csv: Option<PathBuf>,
    bars: usize,
    seed: u64,
    validate: bool,
    output_dir: PathBuf,
    learning_store: Option<PathBuf>,
) -> Result<()> {
    let mut config = match (config_path, preset) {
        (Some(path), None) => RunConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        (None, Some(name)) => {
            let symbol = symbol.context("--preset requires --symbol")?;
            RunConfig {
                symbol,
                engine: EngineConfig::default(),
                strategies: preset_strategies(&name)?,
                data: data_config(csv, bars, seed),
                splits: Vec::new(),
                validation: None,
            }
        }
        (Some(_), Some(_)) => bail!("--config and --preset are mutually exclusive"),
        (None, None) => bail!("either --config or --preset is required"),
    };
    if validate {
        config.validation = Some(ValidationConfig::default());
    }

    let result = run_single_backtest(&config)?;
    print!("{}", render_report(&result));

    let paths = save_artifacts(&result, &output_dir)?;
    println!("artifacts: {}", paths.metrics_json.display());

    if let Some(store_path) = learning_store {
        let mut store = JsonlLearningStore::new(store_path);
        let stored = flush_events(
            &result.run.events,
            &result.run_id,
            &result.config.symbol,
            &mut store,
        );
        println!("learning store: {stored} trades recorded");
    }
    Ok(())
}

fn cmd_sweep(symbol: String, csv: Option<PathBuf>, bars: usize, seed: u64) -> Result<()> {
    let base = RunConfig {
        symbol,
        engine: EngineConfig::default(),
        strategies: vec![Strategy::Breakout(BreakoutParams::default())],
        data: data_config(csv, bars, seed),
        splits: Vec::new(),
        validation: None,
    };
    let rows = sweep(&base, retracement_level_grid())?;

    println!(
        "{:<16} {:>8} {:>12} {:>8} {:>8} {:>7}",
        "variant", "sharpe", "return", "max dd", "win", "trades"
    );
    for row in rows {
        println!(
            "{:<16} {:>8.2} {:>12.2} {:>7.2}% {:>7.1}% {:>7}",
            row.label,
            row.sharpe,
            to_f64(row.total_return, PRICE_SCALE),
            to_f64(row.max_drawdown_frac, FRAC_SCALE) * 100.0,
            to_f64(row.win_rate, FRAC_SCALE) * 100.0,
            row.trade_count,
        );
    }
    Ok(())
}

fn data_config(csv: Option<PathBuf>, bars: usize, seed: u64) -> DataConfig {
    match csv {
        Some(path) => DataConfig::Csv { path },
        None => DataConfig::Synthetic { bars, seed },
    }
}

fn preset_strategies(name: &str) -> Result<Vec<Strategy>> {
    let strategies = match name {
        "retracement" => vec![Strategy::FibonacciRetracement(RetracementParams::default())],
        "momentum" => vec![Strategy::Momentum(MomentumParams::default())],
        "mean-reversion" => vec![Strategy::MeanReversion(MeanReversionParams::default())],
        "breakout" => vec![Strategy::Breakout(BreakoutParams::default())],
        "ensemble" => vec![
            Strategy::FibonacciRetracement(RetracementParams::default()),
            Strategy::Momentum(MomentumParams::default()),
            Strategy::MeanReversion(MeanReversionParams::default()),
            Strategy::Breakout(BreakoutParams::default()),
            Strategy::LucasTimeExit(LucasExitParams::default()),
        ],
        other => bail!(
            "unknown preset `{other}` (expected retracement, momentum, \
             mean-reversion, breakout, or ensemble)"
        ),
    };
    Ok(strategies)
}
