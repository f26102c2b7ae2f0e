//! Fill mechanics: slippage, commission, and intrabar trigger checks.
//!
//! Slippage always works against the trader: buys fill higher, sells fill
//! lower. When one bar touches both the stop and the target, the stop wins
//! (worst-case ordering). A bar that opens beyond a trigger by more than
//! the configured gap threshold fills at the open, not the trigger.

use crate::domain::{Bar, Direction, ExitReason, Position};
use crate::fixed::{div_frac, mul_frac, Cash, Frac, Price, Qty};

/// Fill price for entering a position: pay up in the trade direction.
pub fn entry_fill_price(reference: Price, direction: Direction, slippage: Frac) -> Price {
    reference + direction.sign() * mul_frac(reference, slippage)
}

/// Fill price for exiting a position: give back in the trade direction.
pub fn exit_fill_price(reference: Price, side: Direction, slippage: Frac) -> Price {
    reference - side.sign() * mul_frac(reference, slippage)
}

/// Commission as a fraction of notional.
pub fn commission_cost(notional: Cash, commission: Frac) -> Cash {
    mul_frac(notional, commission)
}

/// Slippage cash cost for a fill of `quantity` at `reference`.
pub fn slippage_cost(reference: Price, quantity: Qty, slippage: Frac) -> Cash {
    mul_frac(reference, slippage) * quantity
}

/// A stop or target trigger resolved against one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub reason: ExitReason,
    /// Pre-slippage exit reference price.
    pub price: Price,
    /// Set when the bar opened past the trigger and the fill moved to the
    /// open.
    pub gapped_from: Option<Price>,
}

/// Check a position's stop and target against a bar's range.
///
/// Stop first (worst case). The trigger fills at its price unless the bar
/// *opened* beyond it by more than `gap_threshold`, in which case the fill
/// is the open — you cannot exit at a price the market never traded.
pub fn check_triggers(position: &Position, bar: &Bar, gap_threshold: Frac) -> Option<Trigger> {
    match position.side {
        Direction::Long => {
            if bar.low <= position.stop {
                return Some(resolve_gap(
                    ExitReason::Stop,
                    position.stop,
                    bar.open,
                    bar.open <= position.stop,
                    gap_threshold,
                ));
            }
            if bar.high >= position.target {
                return Some(resolve_gap(
                    ExitReason::Target,
                    position.target,
                    bar.open,
                    bar.open >= position.target,
                    gap_threshold,
                ));
            }
        }
        Direction::Short => {
            if bar.high >= position.stop {
                return Some(resolve_gap(
                    ExitReason::Stop,
                    position.stop,
                    bar.open,
                    bar.open >= position.stop,
                    gap_threshold,
                ));
            }
            if bar.low <= position.target {
                return Some(resolve_gap(
                    ExitReason::Target,
                    position.target,
                    bar.open,
                    bar.open <= position.target,
                    gap_threshold,
                ));
            }
        }
    }
    None
}

fn resolve_gap(
    reason: ExitReason,
    trigger: Price,
    open: Price,
    opened_beyond: bool,
    gap_threshold: Frac,
) -> Trigger {
    if opened_beyond {
        let gap = div_frac((open - trigger).abs(), trigger);
        if gap >= gap_threshold {
            return Trigger {
                reason,
                price: open,
                gapped_from: Some(trigger),
            };
        }
    }
    Trigger {
        reason,
        price: trigger,
        gapped_from: None,
    }
}
