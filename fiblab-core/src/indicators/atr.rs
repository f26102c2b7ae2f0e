//! Average True Range with Wilder smoothing.
//!
//! True range for the first bar is high - low (no previous close); later
//! bars take max(high-low, |high-prev_close|, |low-prev_close|).

use crate::domain::Bar;
use crate::fixed::Price;

pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<Price>> {
    assert!(period >= 1, "ATR period must be >= 1");
    let n = bars.len();
    let mut result = vec![None; n];
    if n < period {
        return result;
    }

    let tr: Vec<i128> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = (bar.high - bar.low) as i128;
            if i == 0 {
                hl
            } else {
                let pc = bars[i - 1].close as i128;
                hl.max((bar.high as i128 - pc).abs())
                    .max((bar.low as i128 - pc).abs())
            }
        })
        .collect();

    // Seed with the simple mean of the first `period` true ranges, then
    // Wilder smoothing: atr = (prev * (period - 1) + tr) / period.
    let mut current: i128 = tr[..period].iter().sum::<i128>() / period as i128;
    result[period - 1] = Some(current as Price);
    for i in period..n {
        current = (current * (period as i128 - 1) + tr[i]) / period as i128;
        result[i] = Some(current as Price);
    }
    result
}
