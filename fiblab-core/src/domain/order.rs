//! Order — a sized, risk-approved instruction.
//!
//! Produced by the risk manager, consumed by the engine within the same bar
//! (or at the next bar's open, per the configured fill timing).

use super::signal::{Direction, SignalContext};
use crate::fixed::{notional, Cash, Price, Qty};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub direction: Direction,
    pub quantity: Qty,
    /// Reference entry price used for sizing; the actual fill applies
    /// slippage against this.
    pub entry: Price,
    pub stop: Price,
    pub target: Price,
    /// Bar index of the originating signal.
    pub signal_index: usize,
    pub context: SignalContext,
}

impl Order {
    /// Capital at risk per share: distance from entry to stop.
    pub fn risk_per_share(&self) -> Price {
        (self.entry - self.stop).abs()
    }

    /// Total capital at risk if the stop fills.
    pub fn total_risk(&self) -> Cash {
        notional(self.quantity, self.risk_per_share())
    }

    /// Notional value at the reference entry price.
    pub fn notional(&self) -> Cash {
        notional(self.quantity, self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            direction: Direction::Long,
            quantity: 100,
            entry: 50_000_000,
            stop: 47_500_000,
            target: 54_045_000,
            signal_index: 10,
            context: SignalContext::Breakout {
                channel_high: 49_500_000,
                channel_low: 45_000_000,
                volume_ratio: 2_000_000,
            },
        }
    }

    #[test]
    fn risk_per_share() {
        assert_eq!(sample_order().risk_per_share(), 2_500_000);
    }

    #[test]
    fn total_risk_scales_with_quantity() {
        assert_eq!(sample_order().total_risk(), 250_000_000);
    }

    #[test]
    fn notional_value() {
        assert_eq!(sample_order().notional(), 5_000_000_000);
    }

    #[test]
    fn short_risk_is_positive() {
        let order = Order {
            direction: Direction::Short,
            stop: 52_500_000,
            ..sample_order()
        };
        assert_eq!(order.risk_per_share(), 2_500_000);
    }
}
