//! MACD: fast EMA minus slow EMA, with a signal-line EMA of the difference.

use super::ema::ema;
use crate::fixed::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdPoint {
    pub macd: Price,
    pub signal: Price,
    pub histogram: Price,
}

/// MACD(fast, slow, signal) over a close series. Defined once the slow EMA
/// and the signal EMA of the MACD line both have values; earlier bars are
/// `None`.
pub fn macd(
    values: &[Price],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<Option<MacdPoint>> {
    assert!(fast >= 1 && slow > fast, "MACD requires slow > fast >= 1");
    assert!(signal_period >= 1, "signal period must be >= 1");
    let n = values.len();
    let mut result = vec![None; n];
    if n < slow {
        return result;
    }

    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    // MACD line exists from slow-1 onward; collect it densely for the
    // signal EMA, tracking the offset back into bar indices.
    let offset = slow - 1;
    let macd_line: Vec<Price> = (offset..n)
        .map(|i| fast_ema[i].unwrap() - slow_ema[i].unwrap())
        .collect();
    let signal_line = ema(&macd_line, signal_period);

    for (j, sig) in signal_line.iter().enumerate() {
        if let Some(sig) = sig {
            let m = macd_line[j];
            result[offset + j] = Some(MacdPoint {
                macd: m,
                signal: *sig,
                histogram: m - *sig,
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_flat_series_is_zero() {
        let values = vec![100_000_000; 50];
        let m = macd(&values, 12, 26, 9);
        let last = m.last().unwrap().unwrap();
        assert_eq!(last.macd, 0);
        assert_eq!(last.signal, 0);
        assert_eq!(last.histogram, 0);
    }

    #[test]
    fn macd_warmup_length() {
        let values = vec![100_000_000; 50];
        let m = macd(&values, 12, 26, 9);
        // Defined from (slow - 1) + (signal - 1) = 33 onward.
        assert!(m[32].is_none());
        assert!(m[33].is_some());
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let values: Vec<i64> = (0..60).map(|i| (100 + i) * 1_000_000).collect();
        let m = macd(&values, 12, 26, 9);
        let last = m.last().unwrap().unwrap();
        // Fast EMA sits above slow EMA in a steady uptrend.
        assert!(last.macd > 0, "macd={}", last.macd);
    }

    #[test]
    fn macd_crosses_after_reversal() {
        // Long downtrend then sharp uptrend: the MACD line must cross above
        // its signal line somewhere in the recovery.
        let mut values: Vec<i64> = (0..60).map(|i| (200 - i) * 1_000_000).collect();
        values.extend((0..40).map(|i| (140 + 3 * i) * 1_000_000));
        let m = macd(&values, 12, 26, 9);
        let mut crossed = false;
        for pair in m.windows(2) {
            if let (Some(prev), Some(cur)) = (pair[0], pair[1]) {
                if prev.macd < prev.signal && cur.macd > cur.signal {
                    crossed = true;
                }
            }
        }
        assert!(crossed, "no bullish cross found in recovery");
    }

    #[test]
    fn macd_short_series_undefined() {
        let values = vec![100_000_000; 10];
        assert!(macd(&values, 12, 26, 9).iter().all(Option::is_none));
    }
}
