//! Rolling mean and sample standard deviation over a fixed window.

use crate::fixed::{isqrt, Price};

/// Rolling mean of the trailing `period` values, defined from index
/// `period - 1`.
pub fn rolling_mean(values: &[Price], period: usize) -> Vec<Option<Price>> {
    assert!(period >= 1, "rolling period must be >= 1");
    let n = values.len();
    let mut result = vec![None; n];
    if n < period {
        return result;
    }

    let mut sum: i128 = values[..period].iter().map(|&v| v as i128).sum();
    result[period - 1] = Some((sum / period as i128) as Price);
    for i in period..n {
        sum += values[i] as i128 - values[i - period] as i128;
        result[i] = Some((sum / period as i128) as Price);
    }
    result
}

/// Rolling sample standard deviation (n-1 denominator) of the trailing
/// `period` values. Requires `period >= 2`; defined from index `period - 1`.
pub fn rolling_std(values: &[Price], period: usize) -> Vec<Option<Price>> {
    assert!(period >= 2, "std period must be >= 2");
    let n = values.len();
    let mut result = vec![None; n];
    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        let sum: i128 = window.iter().map(|&v| v as i128).sum();
        let mean = sum / period as i128;
        let ss: i128 = window
            .iter()
            .map(|&v| {
                let d = v as i128 - mean;
                d * d
            })
            .sum();
        let variance = ss / (period as i128 - 1);
        result[i] = Some(isqrt(variance));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_basic() {
        let values = vec![10_000_000, 20_000_000, 30_000_000, 40_000_000];
        let m = rolling_mean(&values, 3);
        assert_eq!(m[0], None);
        assert_eq!(m[1], None);
        assert_eq!(m[2], Some(20_000_000));
        assert_eq!(m[3], Some(30_000_000));
    }

    #[test]
    fn mean_window_of_one() {
        let values = vec![5, 7, 9];
        let m = rolling_mean(&values, 1);
        assert_eq!(m, vec![Some(5), Some(7), Some(9)]);
    }

    #[test]
    fn std_constant_series_is_zero() {
        let values = vec![50_000_000; 10];
        let s = rolling_std(&values, 5);
        assert_eq!(s[4], Some(0));
        assert_eq!(s[9], Some(0));
    }

    #[test]
    fn std_known_window() {
        // Window [2, 4, 4, 4, 5, 5, 7, 9] has sample variance 32/7, but use
        // a cleaner case: [10, 20, 30] -> mean 20, ss = 200, var = 100.
        let values = vec![10, 20, 30];
        let s = rolling_std(&values, 3);
        assert_eq!(s[2], Some(10));
    }

    #[test]
    fn std_short_series_undefined() {
        let values = vec![10, 20];
        let s = rolling_std(&values, 3);
        assert!(s.iter().all(Option::is_none));
    }
}
