//! Engine state, diagnostics, and run result types.

use crate::domain::{EquityPoint, Order, Portfolio, Trade};
use crate::fixed::{Cash, Price};
use crate::risk::Rejection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A non-fatal execution condition worth surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A fill was requested on a zero-volume bar and deferred to the next
    /// tradable bar.
    DeferredOnHalt,
    /// Price gapped past a stop/target trigger; the fill happened at the
    /// open instead of the trigger price.
    GapThrough { trigger: Price, fill: Price },
}

/// Per-run diagnostics log. Non-fatal conditions accumulate here and are
/// surfaced alongside the metrics; they never unwind the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    RiskRejection { bar: usize, rejection: Rejection },
    ExecutionAnomaly { bar: usize, anomaly: AnomalyKind },
}

/// A trade-closed event for the outbound queue. The engine only appends;
/// a consumer (the learning store) drains the queue after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trade: Trade,
    /// Mark-to-market equity right after the close.
    pub equity_after: Cash,
}

/// An approved order waiting for its fill bar (next-open entries and fills
/// deferred by a halt).
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub order: Order,
    pub strategy: String,
    pub created_bar: usize,
}

/// Mutable state that evolves bar by bar.
#[derive(Debug)]
pub struct EngineState {
    pub portfolio: Portfolio,
    pub bar_index: usize,
    pub pending: Option<PendingOrder>,
    pub equity_peak: Cash,
    pub diagnostics: Vec<Diagnostic>,
    pub events: Vec<TradeEvent>,
    pub signal_count: usize,
}

impl EngineState {
    pub fn new(initial_capital: Cash) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            bar_index: 0,
            pending: None,
            equity_peak: initial_capital,
            diagnostics: Vec::new(),
            events: Vec::new(),
            signal_count: 0,
        }
    }

    /// Current equity, with a debug-mode re-derivation of the accounting
    /// identity: equity == cash + sum(signed position market values).
    pub fn verify_equity(&self, marks: &HashMap<String, Price>) -> Cash {
        let equity = self.portfolio.equity(marks);

        #[cfg(debug_assertions)]
        {
            let position_value: Cash = self
                .portfolio
                .positions
                .iter()
                .map(|(sym, pos)| {
                    let price = marks.get(sym).copied().unwrap_or(pos.entry_price);
                    pos.market_value(price)
                })
                .sum();
            assert_eq!(
                equity,
                self.portfolio.cash + position_value,
                "equity accounting violated at bar {}",
                self.bar_index
            );
        }

        equity
    }
}

/// Result of a complete (or cooperatively cancelled) backtest run.
#[derive(Debug)]
pub struct RunResult {
    pub symbol: String,
    /// One point per processed bar.
    pub equity_curve: Vec<EquityPoint>,
    /// Completed round trips, in close order.
    pub trades: Vec<Trade>,
    /// Non-fatal conditions accumulated during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// Outbound trade-closed queue for the learning store.
    pub events: Vec<TradeEvent>,
    pub final_equity: Cash,
    pub bar_count: usize,
    pub signal_count: usize,
    /// True when the run stopped at a bar boundary on request.
    pub cancelled: bool,
}

impl RunResult {
    pub fn rejection_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::RiskRejection { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let state = EngineState::new(100_000_000_000);
        assert_eq!(state.portfolio.cash, 100_000_000_000);
        assert_eq!(state.bar_index, 0);
        assert!(state.pending.is_none());
        assert!(state.diagnostics.is_empty());
    }

    #[test]
    fn verify_equity_flat_portfolio() {
        let state = EngineState::new(100_000_000_000);
        let marks = HashMap::new();
        assert_eq!(state.verify_equity(&marks), 100_000_000_000);
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::ExecutionAnomaly {
            bar: 7,
            anomaly: AnomalyKind::GapThrough {
                trigger: 95_000_000,
                fill: 92_000_000,
            },
        };
        let json = serde_json::to_string(&diag).unwrap();
        let deser: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(diag, deser);
    }
}
