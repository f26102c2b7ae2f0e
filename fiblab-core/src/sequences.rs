//! Fibonacci and Lucas lookup tables, retracement ratios, and Zeckendorf
//! encoding.
//!
//! The tables are built once per process and shared by reference — strategies
//! and the risk manager never mutate them. Sequences follow OEIS A000045
//! (Fibonacci) and A000032 (Lucas); Zeckendorf representation is A003714.

use crate::fixed::Ratio;
use std::sync::OnceLock;

/// φ at ratio scale.
pub const PHI: Ratio = 161_803_398;

/// Retracement ratios, shallow to deep.
pub const RETRACEMENT_RATIOS: [Ratio; 5] = [
    23_600_000, // 0.236
    38_200_000, // 0.382
    50_000_000, // 0.500
    61_800_000, // 0.618
    78_600_000, // 0.786
];

/// Extension ratios used for profit targets.
pub const EXTENSION_RATIOS: [Ratio; 2] = [
    127_200_000, // 1.272
    161_800_000, // 1.618
];

/// Largest index at which both sequences still fit in `u64`.
const TABLE_LEN: usize = 91;

/// Immutable Fibonacci/Lucas tables.
#[derive(Debug)]
pub struct SequenceTables {
    fibonacci: Vec<u64>,
    lucas: Vec<u64>,
}

impl SequenceTables {
    fn build() -> Self {
        let mut fibonacci = Vec::with_capacity(TABLE_LEN);
        fibonacci.push(0u64);
        fibonacci.push(1u64);
        for i in 2..TABLE_LEN {
            let next = fibonacci[i - 1] + fibonacci[i - 2];
            fibonacci.push(next);
        }

        let mut lucas = Vec::with_capacity(TABLE_LEN);
        lucas.push(2u64);
        lucas.push(1u64);
        for i in 2..TABLE_LEN {
            let next = lucas[i - 1] + lucas[i - 2];
            lucas.push(next);
        }

        Self { fibonacci, lucas }
    }

    /// Process-wide shared tables, built on first access.
    pub fn global() -> &'static SequenceTables {
        static TABLES: OnceLock<SequenceTables> = OnceLock::new();
        TABLES.get_or_init(SequenceTables::build)
    }

    /// F(n). Panics if `n` is outside the table.
    pub fn fibonacci(&self, n: usize) -> u64 {
        self.fibonacci[n]
    }

    /// L(n). Panics if `n` is outside the table.
    pub fn lucas(&self, n: usize) -> u64 {
        self.lucas[n]
    }

    pub fn len(&self) -> usize {
        TABLE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Zeckendorf representation of `n`: the unique set of non-consecutive
    /// Fibonacci indices (>= 2) whose values sum to `n`. Returns ascending
    /// indices; empty for zero.
    pub fn zeckendorf(&self, n: u64) -> Vec<u32> {
        let mut indices = Vec::new();
        let mut remaining = n;
        let mut i = TABLE_LEN - 1;
        while remaining > 0 && i >= 2 {
            if self.fibonacci[i] <= remaining {
                indices.push(i as u32);
                remaining -= self.fibonacci[i];
                // Skip the adjacent index: representation is non-consecutive
                // by construction of the greedy algorithm.
                i -= 1;
            }
            if i == 2 {
                break;
            }
            i -= 1;
        }
        indices.reverse();
        indices
    }

    /// Sum the Fibonacci numbers at `indices`. Inverse of [`zeckendorf`]
    /// for valid (non-consecutive, >= 2) index sets.
    pub fn zeckendorf_decode(&self, indices: &[u32]) -> u64 {
        indices.iter().map(|&i| self.fibonacci[i as usize]).sum()
    }
}
