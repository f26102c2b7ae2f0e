//! Parameter sweeps — independent runs across a strategy grid.
//!
//! Runs share nothing but the immutable bar series, so they parallelize
//! freely with rayon. Results rank by Sharpe.

use crate::config::RunConfig;
use crate::data::load_series;
use crate::runner::run_on_series;
use fiblab_core::fixed::{Cash, Frac, Ratio};
use fiblab_core::strategy::{RetracementParams, Strategy};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One labelled strategy set to evaluate.
#[derive(Debug, Clone)]
pub struct SweepVariant {
    pub label: String,
    pub strategies: Vec<Strategy>,
}

/// One row of the ranked sweep result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub label: String,
    pub run_id: String,
    pub sharpe: f64,
    pub total_return: Cash,
    pub max_drawdown_frac: Frac,
    pub win_rate: Frac,
    pub trade_count: usize,
}

/// Evaluate every variant against the base config's data, in parallel,
/// and return rows sorted by Sharpe (best first). Variants whose run
/// fails are dropped.
pub fn sweep(base: &RunConfig, variants: Vec<SweepVariant>) -> anyhow::Result<Vec<SweepRow>> {
    let mut series = load_series(&base.data, &base.symbol)?;
    series.adjust_for_splits(&base.splits)?;

    let mut rows: Vec<SweepRow> = variants
        .into_par_iter()
        .filter_map(|variant| {
            let config = RunConfig {
                strategies: variant.strategies,
                ..base.clone()
            };
            let result = run_on_series(&config, &series, None).ok()?;
            Some(SweepRow {
                label: variant.label,
                run_id: result.run_id,
                sharpe: result.metrics.sharpe,
                total_return: result.metrics.total_return,
                max_drawdown_frac: result.metrics.max_drawdown.fraction,
                win_rate: result.metrics.win_rate,
                trade_count: result.metrics.trade_count,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.sharpe.partial_cmp(&a.sharpe).unwrap_or(std::cmp::Ordering::Equal));
    Ok(rows)
}

/// The classic retracement-level grid: which entry supports earn their
/// keep on this series?
pub fn retracement_level_grid() -> Vec<SweepVariant> {
    let sets: [(&str, &[Ratio]); 8] = [
        ("236", &[23_600_000]),
        ("382", &[38_200_000]),
        ("618", &[61_800_000]),
        ("236+382", &[23_600_000, 38_200_000]),
        ("382+618", &[38_200_000, 61_800_000]),
        ("236+382+618", &[23_600_000, 38_200_000, 61_800_000]),
        ("382+500+618", &[38_200_000, 50_000_000, 61_800_000]),
        (
            "all",
            &[23_600_000, 38_200_000, 50_000_000, 61_800_000, 78_600_000],
        ),
    ];
    sets.into_iter()
        .map(|(label, ratios)| SweepVariant {
            label: format!("fib_{label}"),
            strategies: vec![Strategy::FibonacciRetracement(RetracementParams {
                entry_ratios: ratios.to_vec(),
                ..Default::default()
            })],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use fiblab_core::config::EngineConfig;
    use fiblab_core::strategy::BreakoutParams;

    fn base_config() -> RunConfig {
        RunConfig {
            symbol: "SYN".into(),
            engine: EngineConfig::default(),
            strategies: vec![Strategy::Breakout(BreakoutParams::default())],
            data: DataConfig::Synthetic {
                bars: 400,
                seed: 11,
            },
            splits: Vec::new(),
            validation: None,
        }
    }

    #[test]
    fn grid_has_eight_level_sets() {
        let grid = retracement_level_grid();
        assert_eq!(grid.len(), 8);
        assert!(grid.iter().all(|v| v.strategies.len() == 1));
    }

    #[test]
    fn sweep_ranks_by_sharpe() {
        let rows = sweep(&base_config(), retracement_level_grid()).unwrap();
        assert_eq!(rows.len(), 8);
        for pair in rows.windows(2) {
            assert!(pair[0].sharpe >= pair[1].sharpe);
        }
    }

    #[test]
    fn sweep_is_deterministic() {
        let a = sweep(&base_config(), retracement_level_grid()).unwrap();
        let b = sweep(&base_config(), retracement_level_grid()).unwrap();
        assert_eq!(a, b);
    }
}
