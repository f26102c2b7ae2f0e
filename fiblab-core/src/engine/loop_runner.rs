//! Bar-by-bar event loop — the heart of the backtesting engine.
//!
//! Per bar, in order:
//! 1. Fill any pending entry at this bar's open.
//! 2. Mark open positions: age, highest-favorable price, trailing ratchet.
//! 3. Exit checks: stop/target against the bar's high/low (stop first when
//!    both touch, gap-through fills at the open), then strategy-owned exits
//!    at the close. Halted bars defer every fill to the next tradable bar.
//! 4. Signal generation across all configured strategies; the strongest
//!    signal wins. An opposite signal against an open position closes it.
//! 5. Risk sizing of the winning signal; approved orders fill at the close
//!    or queue for the next open, per configuration.
//! 6. Equity append: one `EquityPoint` per bar.
//!
//! The position lifecycle runs Idle -> Signaled -> RiskChecked -> Open ->
//! Monitoring -> Closing -> Closed; a risk rejection short-circuits back to
//! Idle as a logged no-op. The loop itself performs no I/O and is strictly
//! sequential: every decision at bar `t` reads only data up to `t`.
//! Cancellation is cooperative and checked once per bar boundary.

use crate::config::{EngineConfig, EntryFill};
use crate::domain::{Bar, EquityPoint, ExitReason, Order, Position, Signal, Trade};
use crate::engine::execution::{
    check_triggers, commission_cost, entry_fill_price, exit_fill_price, slippage_cost,
};
use crate::engine::state::{
    AnomalyKind, Diagnostic, EngineState, PendingOrder, RunResult, TradeEvent,
};
use crate::error::{ConfigError, EngineError};
use crate::fixed::{div_frac, notional, Price};
use crate::risk::{PortfolioView, Rejection, RiskManager, TradeStats};
use crate::sequences::SequenceTables;
use crate::series::BarSeries;
use crate::strategy::Strategy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run a backtest over one validated bar series.
///
/// Fatal errors (bad config, bad data) unwind before or at the offending
/// bar; everything non-fatal lands in the result's diagnostics.
pub fn run_backtest(
    series: &BarSeries,
    strategies: &[Strategy],
    config: &EngineConfig,
    cancel: Option<&AtomicBool>,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    if strategies.is_empty() {
        return Err(ConfigError::NoStrategies.into());
    }
    for strategy in strategies {
        strategy.validate()?;
    }
    series.validate()?;

    let tables = SequenceTables::global();
    let risk = RiskManager::new(config.risk);
    let bars = &series.bars;
    let symbol = series.symbol.as_str();
    let n = bars.len();

    let mut state = EngineState::new(config.initial_capital);
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(n);
    let mut cancelled = false;
    let mut last_processed: Option<usize> = None;

    for t in 0..n {
        if let Some(flag) = cancel {
            // Checked only at the bar boundary, never mid-bar.
            if flag.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
        }
        state.bar_index = t;
        let bar = &bars[t];

        // ── Phase 1: pending entry fills at the open ──
        if let Some(pending) = state.pending.take() {
            if t + 1 == n {
                // End of data: a same-bar entry could never be closed.
            } else if bar.is_halted() {
                state.diagnostics.push(Diagnostic::ExecutionAnomaly {
                    bar: t,
                    anomaly: AnomalyKind::DeferredOnHalt,
                });
                state.pending = Some(pending);
            } else {
                open_position(&mut state, symbol, &pending.order, &pending.strategy, bar.open, t, config);
            }
        }

        // ── Phase 2: mark open position ──
        if let Some(pos) = state.portfolio.get_position_mut(symbol) {
            if pos.entry_bar < t {
                pos.bars_held += 1;
                pos.update_favorable(bar);
                if let Some(trail) = config.trailing_stop {
                    pos.ratchet_stop(trail);
                }
            }
        }

        // ── Phase 3: exits ──
        let entered_earlier = state
            .portfolio
            .get_position(symbol)
            .is_some_and(|p| p.entry_bar < t);
        if entered_earlier {
            if bar.is_halted() {
                let pos = state.portfolio.get_position(symbol).unwrap();
                if check_triggers(pos, bar, config.gap_threshold).is_some() {
                    // The market is closed for trading; the exit waits for
                    // the next tradable bar rather than being dropped.
                    state.diagnostics.push(Diagnostic::ExecutionAnomaly {
                        bar: t,
                        anomaly: AnomalyKind::DeferredOnHalt,
                    });
                }
            } else {
                let pos = state.portfolio.get_position(symbol).unwrap();
                if let Some(trigger) = check_triggers(pos, bar, config.gap_threshold) {
                    if let Some(from) = trigger.gapped_from {
                        state.diagnostics.push(Diagnostic::ExecutionAnomaly {
                            bar: t,
                            anomaly: AnomalyKind::GapThrough {
                                trigger: from,
                                fill: trigger.price,
                            },
                        });
                    }
                    close_position(
                        &mut state,
                        &mut trades,
                        symbol,
                        trigger.price,
                        trigger.reason,
                        t,
                        bars,
                        config,
                    );
                } else {
                    let pos = state.portfolio.get_position(symbol).unwrap().clone();
                    let exit = strategies
                        .iter()
                        .filter(|s| s.is_exit_overlay() || s.name() == pos.strategy)
                        .find_map(|s| s.check_exit(bars, t, &pos, tables));
                    if let Some(reason) = exit {
                        close_position(
                            &mut state, &mut trades, symbol, bar.close, reason, t, bars, config,
                        );
                    }
                }
            }
        }

        // ── Phase 4: signal generation ──
        let mut best: Option<Signal> = None;
        for strategy in strategies {
            if let Some(signal) = strategy.generate_signal(bars, t, tables) {
                state.signal_count += 1;
                let stronger = match &best {
                    Some(current) => signal.strength > current.strength,
                    None => true,
                };
                if stronger {
                    best = Some(signal);
                }
            }
        }

        if let Some(signal) = best {
            let open_side = state.portfolio.get_position(symbol).map(|p| p.side);
            match open_side {
                Some(side) if side != signal.direction => {
                    // Reversal: close, do not flip within the same bar.
                    let closeable = state
                        .portfolio
                        .get_position(symbol)
                        .is_some_and(|p| p.entry_bar < t);
                    if closeable && !bar.is_halted() {
                        close_position(
                            &mut state,
                            &mut trades,
                            symbol,
                            bar.close,
                            ExitReason::SignalReversal,
                            t,
                            bars,
                            config,
                        );
                    }
                }
                Some(_) => {
                    // Already positioned in this direction; no pyramiding.
                }
                None if state.pending.is_none() && t + 1 < n => {
                    // ── Phase 5: risk sizing ──
                    let marks = HashMap::from([(symbol.to_string(), bar.close)]);
                    let equity = state.portfolio.equity(&marks);
                    let view = PortfolioView {
                        equity,
                        cash: state.portfolio.cash,
                        open_risk: state.portfolio.open_risk(),
                        open_positions: state.portfolio.open_positions(),
                    };
                    let stats = TradeStats::from_trades(&trades, config.risk.stats_window);
                    match risk.size_and_validate(&signal, &view, &stats, bars, t) {
                        Ok(order) => {
                            let strategy_name = strategy_for(strategies, &signal);
                            if bar.is_halted() {
                                state.diagnostics.push(Diagnostic::ExecutionAnomaly {
                                    bar: t,
                                    anomaly: AnomalyKind::DeferredOnHalt,
                                });
                                state.pending = Some(PendingOrder {
                                    order,
                                    strategy: strategy_name,
                                    created_bar: t,
                                });
                            } else {
                                match config.entry_fill {
                                    EntryFill::Close => open_position(
                                        &mut state,
                                        symbol,
                                        &order,
                                        &strategy_name,
                                        bar.close,
                                        t,
                                        config,
                                    ),
                                    EntryFill::NextOpen => {
                                        state.pending = Some(PendingOrder {
                                            order,
                                            strategy: strategy_name,
                                            created_bar: t,
                                        });
                                    }
                                }
                            }
                        }
                        Err(rejection) => {
                            state.diagnostics.push(Diagnostic::RiskRejection {
                                bar: t,
                                rejection,
                            });
                        }
                    }
                }
                None => {}
            }
        }

        // End of data closes whatever is still open at the final close.
        if t == n - 1 {
            if state
                .portfolio
                .get_position(symbol)
                .is_some_and(|p| p.entry_bar < t)
            {
                close_position(
                    &mut state,
                    &mut trades,
                    symbol,
                    bar.close,
                    ExitReason::EndOfData,
                    t,
                    bars,
                    config,
                );
            }
            state.pending = None;
        }

        // ── Phase 6: equity append ──
        let marks = HashMap::from([(symbol.to_string(), bar.close)]);
        let equity = state.verify_equity(&marks);
        state.equity_peak = state.equity_peak.max(equity);
        let drawdown = if state.equity_peak > 0 {
            div_frac(state.equity_peak - equity, state.equity_peak)
        } else {
            0
        };
        equity_curve.push(EquityPoint {
            bar_index: t,
            date: bar.date,
            cash: state.portfolio.cash,
            equity,
            drawdown,
        });
        last_processed = Some(t);
    }

    // A cancelled run still closes its book where it can: a position
    // entered on the last processed bar stays open (its exit would predate
    // its entry) and is carried in the final mark instead.
    if cancelled {
        if let Some(t) = last_processed {
            let closeable = state
                .portfolio
                .get_position(symbol)
                .is_some_and(|p| p.entry_bar < t);
            if closeable {
                let close = bars[t].close;
                close_position(
                    &mut state,
                    &mut trades,
                    symbol,
                    close,
                    ExitReason::EndOfData,
                    t,
                    bars,
                    config,
                );
            }
        }
    }

    let final_equity = if state.portfolio.positions.is_empty() {
        state.portfolio.cash
    } else {
        equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(config.initial_capital)
    };

    Ok(RunResult {
        symbol: symbol.to_string(),
        equity_curve,
        trades,
        diagnostics: state.diagnostics,
        events: state.events,
        final_equity,
        bar_count: last_processed.map_or(0, |t| t + 1),
        signal_count: state.signal_count,
        cancelled,
    })
}

/// Name of the strategy that produced this signal.
fn strategy_for(strategies: &[Strategy], signal: &Signal) -> String {
    use crate::domain::SignalContext;
    let name = match signal.context {
        SignalContext::Retracement { .. } => "fibonacci_retracement",
        SignalContext::Momentum { .. } => "momentum",
        SignalContext::MeanReversion { .. } => "mean_reversion",
        SignalContext::Breakout { .. } => "breakout",
    };
    debug_assert!(strategies.iter().any(|s| s.name() == name));
    name.to_string()
}

#[allow(clippy::too_many_arguments)]
fn open_position(
    state: &mut EngineState,
    symbol: &str,
    order: &Order,
    strategy: &str,
    reference: Price,
    t: usize,
    config: &EngineConfig,
) {
    let fill = entry_fill_price(reference, order.direction, config.slippage);
    let cost = notional(order.quantity, fill);
    let commission = commission_cost(cost, config.commission);
    let slippage = slippage_cost(reference, order.quantity, config.slippage);

    // Slippage can push the cost past what the sizer approved against.
    if cost + commission > state.portfolio.cash {
        state.diagnostics.push(Diagnostic::RiskRejection {
            bar: t,
            rejection: Rejection::InsufficientCapital {
                required: cost + commission,
                available: state.portfolio.cash,
            },
        });
        return;
    }

    match order.direction {
        crate::domain::Direction::Long => state.portfolio.cash -= cost + commission,
        crate::domain::Direction::Short => state.portfolio.cash += cost - commission,
    }
    state.portfolio.total_commission += commission;
    state.portfolio.total_slippage += slippage;

    state.portfolio.positions.insert(
        symbol.to_string(),
        Position {
            symbol: symbol.to_string(),
            side: order.direction,
            quantity: order.quantity,
            entry_bar: t,
            entry_price: fill,
            stop: order.stop,
            target: order.target,
            highest_favorable: fill,
            bars_held: 0,
            strategy: strategy.to_string(),
            entry_context: order.context,
            open_commission: commission,
            open_slippage: slippage,
        },
    );
}

#[allow(clippy::too_many_arguments)]
fn close_position(
    state: &mut EngineState,
    trades: &mut Vec<Trade>,
    symbol: &str,
    reference: Price,
    reason: ExitReason,
    t: usize,
    bars: &[Bar],
    config: &EngineConfig,
) {
    let Some(pos) = state.portfolio.positions.remove(symbol) else {
        return;
    };
    let fill = exit_fill_price(reference, pos.side, config.slippage);
    let proceeds = notional(pos.quantity, fill);
    let commission = commission_cost(proceeds, config.commission);
    let slippage = slippage_cost(reference, pos.quantity, config.slippage);

    match pos.side {
        crate::domain::Direction::Long => state.portfolio.cash += proceeds - commission,
        crate::domain::Direction::Short => state.portfolio.cash -= proceeds + commission,
    }
    state.portfolio.total_commission += commission;
    state.portfolio.total_slippage += slippage;

    let gross_pnl = pos.side.sign() * notional(pos.quantity, fill - pos.entry_price);
    let total_commission = pos.open_commission + commission;
    let total_slippage = pos.open_slippage + slippage;

    let trade = Trade {
        symbol: symbol.to_string(),
        side: pos.side,
        quantity: pos.quantity,
        entry_bar: pos.entry_bar,
        entry_date: bars[pos.entry_bar].date,
        entry_price: pos.entry_price,
        exit_bar: t,
        exit_date: bars[t].date,
        exit_price: fill,
        gross_pnl,
        commission: total_commission,
        slippage: total_slippage,
        net_pnl: gross_pnl - total_commission,
        bars_held: pos.bars_held,
        exit_reason: reason,
        strategy: pos.strategy,
        entry_context: pos.entry_context,
    };
    state.events.push(TradeEvent {
        trade: trade.clone(),
        equity_after: state.portfolio.cash,
    });
    trades.push(trade);
}
