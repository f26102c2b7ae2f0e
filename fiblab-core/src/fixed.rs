//! Fixed-point arithmetic — scaled-integer money, fractions, and ratios.
//!
//! Every price, cash amount, and ratio in the engine is an `i64` scaled by a
//! fixed power of ten. Multiplication and division widen to `i128` and
//! rescale explicitly; division truncates toward zero. This is a correctness
//! contract: repeated float operations drift, and drift silently corrupts
//! P&L over a multi-year run.
//!
//! Scales:
//! - `Price`/`Cash`: 10^6 (one unit = one micro-dollar)
//! - `Frac`: 10^6 (1_000_000 = 100%)
//! - `Ratio`: 10^8 (used for the Fibonacci ratio tables; φ = 161_803_398)

/// A price or per-share amount, scaled by [`PRICE_SCALE`].
pub type Price = i64;

/// A cash/account amount, scaled by [`PRICE_SCALE`].
pub type Cash = i64;

/// A whole-share quantity. Orders are never fractional.
pub type Qty = i64;

/// A fraction (percentage, rate, probability), scaled by [`FRAC_SCALE`].
pub type Frac = i64;

/// A high-precision ratio constant, scaled by [`RATIO_SCALE`].
pub type Ratio = i64;

pub const PRICE_SCALE: i64 = 1_000_000;
pub const FRAC_SCALE: i64 = 1_000_000;
pub const RATIO_SCALE: i64 = 100_000_000;

/// `(a * b) / den` with an `i128` intermediate. Truncates toward zero.
pub fn mul_div(a: i64, b: i64, den: i64) -> i64 {
    debug_assert!(den != 0, "mul_div by zero");
    ((a as i128 * b as i128) / den as i128) as i64
}

/// Multiply a scaled value by a fraction: `value * frac / FRAC_SCALE`.
pub fn mul_frac(value: i64, frac: Frac) -> i64 {
    mul_div(value, frac, FRAC_SCALE)
}

/// Multiply a scaled value by a ratio: `value * ratio / RATIO_SCALE`.
pub fn mul_ratio(value: i64, ratio: Ratio) -> i64 {
    mul_div(value, ratio, RATIO_SCALE)
}

/// `num / den` expressed as a fraction at [`FRAC_SCALE`].
pub fn div_frac(num: i64, den: i64) -> Frac {
    debug_assert!(den != 0, "div_frac by zero");
    ((num as i128 * FRAC_SCALE as i128) / den as i128) as i64
}

/// Like [`mul_frac`] but rounds to nearest by adding a half-scale bias
/// before the shift. Callers that need rounding instead of truncation.
pub fn mul_frac_round(value: i64, frac: Frac) -> i64 {
    let prod = value as i128 * frac as i128;
    let half = FRAC_SCALE as i128 / 2;
    let biased = if prod >= 0 { prod + half } else { prod - half };
    (biased / FRAC_SCALE as i128) as i64
}

/// Notional value of `qty` shares at `price`. Stays in `i128` internally.
pub fn notional(qty: Qty, price: Price) -> Cash {
    (qty as i128 * price as i128) as i64
}

/// Integer square root (floor) of a non-negative `i128`.
///
/// Used for rolling standard deviation: the variance of price-scaled values
/// is price²-scaled, so its root lands back on the price scale.
pub fn isqrt(n: i128) -> i64 {
    debug_assert!(n >= 0, "isqrt of negative");
    if n < 2 {
        return n as i64;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x as i64
}

/// Parse a decimal string (e.g. `"123.45"`) straight to a scaled [`Price`],
/// never routing through floating point. At most six fractional digits are
/// kept; extra digits truncate.
pub fn price_from_decimal(s: &str) -> Option<Price> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if s.is_empty() {
        return None;
    }
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut frac_val: i64 = 0;
    let mut scale = PRICE_SCALE / 10;
    for ch in frac_part.chars().take(6) {
        let digit = ch.to_digit(10)? as i64;
        frac_val += digit * scale;
        scale /= 10;
    }
    // Reject non-digit tails beyond the kept precision.
    if frac_part.len() > 6 && !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let magnitude = int_val.checked_mul(PRICE_SCALE)?.checked_add(frac_val)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Render a scaled [`Price`] as a decimal string with six fractional digits.
pub fn format_price(p: Price) -> String {
    let sign = if p < 0 { "-" } else { "" };
    let abs = p.unsigned_abs();
    format!(
        "{sign}{}.{:06}",
        abs / PRICE_SCALE as u64,
        abs % PRICE_SCALE as u64
    )
}

/// Convert a scaled value to `f64`. Reporting/statistics boundary only —
/// the simulation loop never calls this.
pub fn to_f64(value: i64, scale: i64) -> f64 {
    value as f64 / scale as f64
}
