//! Learning store — the persistence boundary for closed trades.
//!
//! The engine never talks to storage: it appends trade-closed events to an
//! outbox, and the runner drains that queue here strictly after the run.
//! Between runs, `query_similar` can inform parameter selection; it is
//! never consulted mid-run.

use crate::config::RunId;
use fiblab_core::domain::{ExitReason, Trade};
use fiblab_core::engine::TradeEvent;
use fiblab_core::fixed::Cash;
use fiblab_core::sequences::SequenceTables;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("learning store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt learning record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Context stored beside each trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeContext {
    pub run_id: RunId,
    pub symbol: String,
    pub strategy: String,
    pub exit_reason: ExitReason,
    pub equity_after: Cash,
    /// Zeckendorf fingerprint of the whole-dollar net P&L magnitude.
    pub encoded_pnl: Vec<u32>,
}

/// One persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTrade {
    pub trade: Trade,
    pub context: TradeContext,
}

/// Write-only during a run; ranked read-back between runs.
pub trait LearningStore {
    fn record_trade(&mut self, trade: &Trade, context: &TradeContext)
        -> Result<(), LearningError>;

    /// Best stored trades for a strategy, ranked by net P&L.
    fn query_similar(
        &self,
        strategy: &str,
        limit: usize,
    ) -> Result<Vec<StoredTrade>, LearningError>;
}

/// Append-only JSON-lines store.
pub struct JsonlLearningStore {
    path: PathBuf,
}

impl JsonlLearningStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> LearningError {
        LearningError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LearningStore for JsonlLearningStore {
    fn record_trade(
        &mut self,
        trade: &Trade,
        context: &TradeContext,
    ) -> Result<(), LearningError> {
        let record = StoredTrade {
            trade: trade.clone(),
            context: context.clone(),
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        let line = serde_json::to_string(&record)?;
        writeln!(file, "{line}").map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn query_similar(
        &self,
        strategy: &str,
        limit: usize,
    ) -> Result<Vec<StoredTrade>, LearningError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        let mut records = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_err(e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredTrade = serde_json::from_str(&line)?;
            if record.context.strategy == strategy {
                records.push(record);
            }
        }
        records.sort_by_key(|r| std::cmp::Reverse(r.trade.net_pnl));
        records.truncate(limit);
        Ok(records)
    }
}

/// Drain a run's outbox into a store. Returns how many events persisted;
/// store failures do not unwind — the backtest result stands on its own.
pub fn flush_events(
    events: &[TradeEvent],
    run_id: &RunId,
    symbol: &str,
    store: &mut dyn LearningStore,
) -> usize {
    let tables = SequenceTables::global();
    let mut stored = 0;
    for event in events {
        let context = TradeContext {
            run_id: run_id.clone(),
            symbol: symbol.to_string(),
            strategy: event.trade.strategy.clone(),
            exit_reason: event.trade.exit_reason,
            equity_after: event.equity_after,
            encoded_pnl: tables.zeckendorf(
                (event.trade.net_pnl.unsigned_abs()) / fiblab_core::fixed::PRICE_SCALE as u64,
            ),
        };
        if store.record_trade(&event.trade, &context).is_ok() {
            stored += 1;
        }
    }
    stored
}
