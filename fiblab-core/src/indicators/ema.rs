//! Exponential moving average, SMA-seeded.
//!
//! `ema[i] = ema[i-1] + (value[i] - ema[i-1]) * 2 / (period + 1)`, seeded
//! with the simple mean of the first `period` values. Integer division
//! truncates each step; the drift is deterministic and bounded by one scale
//! unit per bar.

use crate::fixed::Price;

pub fn ema(values: &[Price], period: usize) -> Vec<Option<Price>> {
    assert!(period >= 1, "EMA period must be >= 1");
    let n = values.len();
    let mut result = vec![None; n];
    if n < period {
        return result;
    }

    let seed: i128 = values[..period].iter().map(|&v| v as i128).sum::<i128>() / period as i128;
    let mut current = seed as i64;
    result[period - 1] = Some(current);

    let denom = period as i128 + 1;
    for i in period..n {
        let delta = (values[i] as i128 - current as i128) * 2 / denom;
        current += delta as i64;
        result[i] = Some(current);
    }
    result
}
