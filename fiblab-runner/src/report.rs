//! Plain-text performance report.

use crate::runner::BacktestResult;
use fiblab_core::fixed::{to_f64, FRAC_SCALE, PRICE_SCALE};
use std::fmt::Write;

/// Render the report the CLI prints after a run.
pub fn render_report(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let dollars = |v: i64| to_f64(v, PRICE_SCALE);
    let pct = |v: i64| to_f64(v, FRAC_SCALE) * 100.0;

    let mut out = String::new();
    let rule = "=".repeat(62);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "  {} — run {}",
        result.run.symbol,
        &result.run_id[..12.min(result.run_id.len())]
    );
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "Returns");
    let _ = writeln!(
        out,
        "  Total return      {:>14.2}  ({:.2}%)",
        dollars(m.total_return),
        pct(m.total_return_frac)
    );
    let _ = writeln!(out, "  CAGR              {:>13.2}%", m.cagr * 100.0);
    let _ = writeln!(out, "  Sharpe            {:>14.2}", m.sharpe);
    let _ = writeln!(out, "  Sortino           {:>14.2}", m.sortino);
    let _ = writeln!(out, "  Calmar            {:>14.2}", m.calmar);
    let _ = writeln!(
        out,
        "  Max drawdown      {:>14.2}  ({:.2}%, bars {}..{})",
        dollars(m.max_drawdown.amount),
        pct(m.max_drawdown.fraction),
        m.max_drawdown.peak_index,
        m.max_drawdown.trough_index
    );

    let _ = writeln!(out, "Trades");
    let _ = writeln!(
        out,
        "  Count             {:>14}  ({} wins / {} losses)",
        m.trade_count, m.winning_trades, m.losing_trades
    );
    let _ = writeln!(out, "  Win rate          {:>13.2}%", pct(m.win_rate));
    let _ = writeln!(out, "  Profit factor     {:>14.2}", m.profit_factor);
    let _ = writeln!(out, "  Expectancy        {:>14.2}", dollars(m.expectancy));
    let _ = writeln!(
        out,
        "  Avg win / loss    {:>14.2} / {:.2}",
        dollars(m.avg_win),
        dollars(m.avg_loss)
    );
    let _ = writeln!(out, "  Avg bars held     {:>14.1}", m.avg_bars_held);

    if let Some(b) = &result.bootstrap {
        let _ = writeln!(out, "Validation ({} resamples)", b.resamples);
        let _ = writeln!(
            out,
            "  Expectancy 90% CI {:>14.2} .. {:.2}",
            b.expectancy_ci.0, b.expectancy_ci.1
        );
    }
    if let Some(mc) = &result.monte_carlo {
        let _ = writeln!(
            out,
            "  Drawdown p50/p95  {:>14.2} / {:.2}",
            mc.drawdown_p50, mc.drawdown_p95
        );
    }

    let _ = writeln!(
        out,
        "Diagnostics: {} signals, {} rejections, {} total entries",
        result.run.signal_count,
        result.run.rejection_count(),
        result.run.diagnostics.len()
    );
    let _ = writeln!(out, "{rule}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, RunConfig};
    use crate::runner::run_single_backtest;
    use fiblab_core::config::EngineConfig;
    use fiblab_core::strategy::{BreakoutParams, Strategy};

    #[test]
    fn report_renders_headline_sections() {
        let result = run_single_backtest(&RunConfig {
            symbol: "SYN".into(),
            engine: EngineConfig::default(),
            strategies: vec![Strategy::Breakout(BreakoutParams::default())],
            data: DataConfig::Synthetic {
                bars: 300,
                seed: 42,
            },
            splits: Vec::new(),
            validation: None,
        })
        .unwrap();

        let report = render_report(&result);
        assert!(report.contains("SYN"));
        assert!(report.contains("Sharpe"));
        assert!(report.contains("Max drawdown"));
        assert!(report.contains("Win rate"));
        assert!(report.contains("Diagnostics"));
    }
}
