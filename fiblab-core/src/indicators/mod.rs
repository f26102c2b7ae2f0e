//! Fixed-point indicator functions.
//!
//! Each indicator maps a series to a `Vec<Option<_>>` of the same length;
//! `None` marks warm-up bars with no defined value. Values at index `i`
//! depend only on inputs up to and including `i` — the truncation tests in
//! `tests/lookahead_test.rs` enforce this for every indicator.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;

pub use atr::atr;
pub use ema::ema;
pub use macd::{macd, MacdPoint};
pub use rolling::{rolling_mean, rolling_std};
pub use rsi::rsi;

/// Create synthetic bars from scaled close prices for testing.
///
/// Generates plausible OHLV: open = prev close (or close for the first
/// bar), high/low bracket open and close by one dollar, volume 1000.
#[cfg(test)]
pub fn make_bars(closes: &[crate::fixed::Price]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1_000_000;
            let low = open.min(close) - 1_000_000;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}
