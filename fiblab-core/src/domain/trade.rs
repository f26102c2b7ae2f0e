//! Trade — the immutable record of a closed position.

use super::signal::{Direction, SignalContext};
use crate::fixed::{div_frac, notional, Cash, Frac, Price, Qty};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a position was closed. Exactly one reason per trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Stop,
    Target,
    SignalReversal,
    TimeExit,
    EndOfData,
}

/// A completed round trip, appended to the ledger on close and never
/// mutated afterward.
///
/// Slippage is embedded in the recorded fill prices (fills execute at
/// price ± slippage), so `net_pnl = gross_pnl - commission`; the `slippage`
/// field reports the cash lost to it for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: Direction,
    pub quantity: Qty,

    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: Price,

    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: Price,

    pub gross_pnl: Cash,
    pub commission: Cash,
    pub slippage: Cash,
    pub net_pnl: Cash,

    pub bars_held: usize,
    pub exit_reason: ExitReason,

    pub strategy: String,
    pub entry_context: SignalContext,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0
    }

    /// Net return as a fraction of entry notional.
    pub fn return_frac(&self) -> Frac {
        let entry_notional = notional(self.quantity, self.entry_price);
        if entry_notional == 0 {
            return 0;
        }
        div_frac(self.net_pnl, entry_notional)
    }
}
