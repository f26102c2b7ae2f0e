//! fiblab core — the backtesting engine.
//!
//! This crate contains the simulation core and nothing else — no I/O, no
//! rendering, no data acquisition:
//! - Fixed-point arithmetic (scaled-integer prices, cash, fractions)
//! - Fibonacci/Lucas sequence tables and Zeckendorf encoding
//! - Domain types (bars, signals, orders, positions, trades, equity curve)
//! - Five strategies behind one closed enum
//! - Risk manager (Kelly / fixed-fractional sizing, stops, targets,
//!   portfolio heat gate)
//! - Bar-by-bar event loop with slippage, commission, gap handling, halt
//!   deferral, and cooperative cancellation

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod indicators;
pub mod risk;
pub mod sequences;
pub mod series;
pub mod strategy;
