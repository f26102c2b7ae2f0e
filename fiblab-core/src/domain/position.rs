//! Position — an open holding, mutated every bar until closed.

use super::bar::Bar;
use super::signal::{Direction, SignalContext};
use crate::fixed::{mul_frac, notional, Cash, Frac, Price, Qty};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Direction,
    pub quantity: Qty,
    pub entry_bar: usize,
    /// Actual fill price, slippage included.
    pub entry_price: Price,
    pub stop: Price,
    pub target: Price,
    /// Best price seen since entry: highest high for longs, lowest low for
    /// shorts. Drives the trailing-stop ratchet.
    pub highest_favorable: Price,
    pub bars_held: usize,
    /// Which strategy opened this position (its exit rules apply).
    pub strategy: String,
    pub entry_context: SignalContext,
    /// Costs accrued at entry, carried into the closing trade record.
    pub open_commission: Cash,
    pub open_slippage: Cash,
}

impl Position {
    /// Signed mark-to-market value: positive for longs, negative for shorts
    /// (a short is a liability until bought back).
    pub fn market_value(&self, price: Price) -> Cash {
        self.side.sign() * notional(self.quantity, price)
    }

    pub fn unrealized_pnl(&self, price: Price) -> Cash {
        self.side.sign() * notional(self.quantity, price - self.entry_price)
    }

    /// Capital at risk if the stop fills.
    pub fn risk(&self) -> Cash {
        notional(self.quantity, (self.entry_price - self.stop).abs())
    }

    /// Update the highest-favorable price from this bar's extremes.
    pub fn update_favorable(&mut self, bar: &Bar) {
        match self.side {
            Direction::Long => self.highest_favorable = self.highest_favorable.max(bar.high),
            Direction::Short => self.highest_favorable = self.highest_favorable.min(bar.low),
        }
    }

    /// Ratchet the stop toward the highest-favorable price by `trail_frac`.
    /// The stop only ever tightens.
    pub fn ratchet_stop(&mut self, trail_frac: Frac) {
        let offset = mul_frac(self.highest_favorable, trail_frac);
        match self.side {
            Direction::Long => self.stop = self.stop.max(self.highest_favorable - offset),
            Direction::Short => self.stop = self.stop.min(self.highest_favorable + offset),
        }
    }

    /// True once price has moved at least `frac` of entry in our favor.
    pub fn favorable_excursion_exceeds(&self, frac: Frac) -> bool {
        let moved = self.side.sign() * (self.highest_favorable - self.entry_price);
        moved >= mul_frac(self.entry_price, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_position(side: Direction) -> Position {
        Position {
            symbol: "SPY".into(),
            side,
            quantity: 100,
            entry_bar: 5,
            entry_price: 100_000_000,
            stop: 95_000_000,
            target: 108_090_000,
            highest_favorable: 100_000_000,
            bars_held: 0,
            strategy: "breakout".into(),
            entry_context: SignalContext::Breakout {
                channel_high: 99_000_000,
                channel_low: 90_000_000,
                volume_ratio: 1_700_000,
            },
            open_commission: 10_000_000,
            open_slippage: 10_000_000,
        }
    }

    fn bar(high: Price, low: Price) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: (high + low) / 2,
            high,
            low,
            close: (high + low) / 2,
            volume: 1000,
        }
    }

    #[test]
    fn long_market_value_and_pnl() {
        let pos = sample_position(Direction::Long);
        assert_eq!(pos.market_value(110_000_000), 11_000_000_000);
        assert_eq!(pos.unrealized_pnl(110_000_000), 1_000_000_000);
    }

    #[test]
    fn short_market_value_is_negative() {
        let pos = sample_position(Direction::Short);
        assert_eq!(pos.market_value(110_000_000), -11_000_000_000);
        // Price rose against the short.
        assert_eq!(pos.unrealized_pnl(110_000_000), -1_000_000_000);
    }

    #[test]
    fn risk_uses_stop_distance() {
        let pos = sample_position(Direction::Long);
        assert_eq!(pos.risk(), 500_000_000); // 100 shares * 5.000000
    }

    #[test]
    fn favorable_tracks_high_for_long() {
        let mut pos = sample_position(Direction::Long);
        pos.update_favorable(&bar(112_000_000, 99_000_000));
        assert_eq!(pos.highest_favorable, 112_000_000);
        pos.update_favorable(&bar(105_000_000, 95_000_000));
        assert_eq!(pos.highest_favorable, 112_000_000);
    }

    #[test]
    fn favorable_tracks_low_for_short() {
        let mut pos = sample_position(Direction::Short);
        pos.update_favorable(&bar(101_000_000, 92_000_000));
        assert_eq!(pos.highest_favorable, 92_000_000);
    }

    #[test]
    fn ratchet_only_tightens() {
        let mut pos = sample_position(Direction::Long);
        pos.highest_favorable = 110_000_000;
        pos.ratchet_stop(50_000); // 5% trail -> 104.5
        assert_eq!(pos.stop, 104_500_000);
        // Favorable price falls back; stop must not loosen.
        pos.highest_favorable = 106_000_000;
        pos.ratchet_stop(50_000);
        assert_eq!(pos.stop, 104_500_000);
    }

    #[test]
    fn favorable_excursion_check() {
        let mut pos = sample_position(Direction::Long);
        assert!(!pos.favorable_excursion_exceeds(50_000));
        pos.highest_favorable = 106_000_000;
        assert!(pos.favorable_excursion_exceeds(50_000));
    }
}
