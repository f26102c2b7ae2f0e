//! Relative Strength Index with Wilder smoothing, in fixed point.
//!
//! RSI is expressed as a fraction at FRAC_SCALE (1_000_000 = 100), so the
//! classic oversold/overbought levels 30/70 are 300_000/700_000.
//! Edge cases: no losses -> FRAC_SCALE; no gains -> 0; no movement -> half.

use crate::fixed::{Frac, Price, FRAC_SCALE};

pub fn rsi(values: &[Price], period: usize) -> Vec<Option<Frac>> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = values.len();
    let mut result = vec![None; n];
    if n < period + 1 {
        return result;
    }

    // Seed: average gain/loss over the first `period` changes. Averages are
    // kept at period-fold magnitude (sums) to avoid losing precision to the
    // division; Wilder smoothing works identically on sums.
    let mut gain_sum: i128 = 0;
    let mut loss_sum: i128 = 0;
    for i in 1..=period {
        let change = values[i] as i128 - values[i - 1] as i128;
        if change > 0 {
            gain_sum += change;
        } else {
            loss_sum -= change;
        }
    }
    result[period] = Some(compute_rsi(gain_sum, loss_sum));

    // Wilder smoothing: sum = sum - sum/period + current.
    for i in (period + 1)..n {
        let change = values[i] as i128 - values[i - 1] as i128;
        let gain = change.max(0);
        let loss = (-change).max(0);
        gain_sum = gain_sum - gain_sum / period as i128 + gain;
        loss_sum = loss_sum - loss_sum / period as i128 + loss;
        result[i] = Some(compute_rsi(gain_sum, loss_sum));
    }
    result
}

fn compute_rsi(gain: i128, loss: i128) -> Frac {
    if gain == 0 && loss == 0 {
        FRAC_SCALE / 2
    } else {
        (gain * FRAC_SCALE as i128 / (gain + loss)) as Frac
    }
}
