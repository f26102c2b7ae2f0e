//! Kelly criterion in fixed point.
//!
//! `f = W - (1 - W) / R` where `W` is the trailing win rate and `R` the
//! win/loss payoff ratio. A non-positive edge clamps to zero — the caller
//! treats that as "do not size this trade with Kelly".

use crate::fixed::{Cash, Frac, FRAC_SCALE};

/// Full Kelly fraction at FRAC_SCALE. Zero when the inputs give no edge.
pub fn kelly_fraction(win_rate: Frac, avg_win: Cash, avg_loss: Cash) -> Frac {
    if avg_win <= 0 || avg_loss <= 0 || win_rate <= 0 {
        return 0;
    }
    // Payoff ratio R at FRAC_SCALE.
    let payoff = (avg_win as i128 * FRAC_SCALE as i128) / avg_loss as i128;
    if payoff == 0 {
        return 0;
    }
    let lose_rate = (FRAC_SCALE - win_rate) as i128;
    let f = win_rate as i128 - (lose_rate * FRAC_SCALE as i128) / payoff;
    f.max(0) as Frac
}
