//! Portfolio — cash plus all open positions.

use super::position::Position;
use crate::fixed::{Cash, Price};
use std::collections::HashMap;

/// Aggregate portfolio state.
///
/// The accounting identity must hold at every bar:
/// `equity == cash + sum(signed position market values)`.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: Cash,
    pub initial_capital: Cash,
    pub positions: HashMap<String, Position>,
    pub total_commission: Cash,
    pub total_slippage: Cash,
}

impl Portfolio {
    pub fn new(initial_capital: Cash) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            total_commission: 0,
            total_slippage: 0,
        }
    }

    /// Total equity = cash + sum of signed position market values.
    pub fn equity(&self, marks: &HashMap<String, Price>) -> Cash {
        let position_value: Cash = self
            .positions
            .iter()
            .map(|(sym, pos)| {
                let price = marks.get(sym).copied().unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Aggregate capital at risk across open positions (portfolio heat
    /// numerator).
    pub fn open_risk(&self) -> Cash {
        self.positions.values().map(Position::risk).sum()
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn get_position_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }
}
