//! fiblab runner — orchestration around the core engine.
//!
//! Everything the simulation core deliberately excludes lives here: run
//! configuration (TOML, content-addressed run ids), market-data providers
//! (CSV and synthetic), the performance analyzer, bootstrap/Monte Carlo
//! validation, parallel parameter sweeps, the learning store, and artifact
//! export.

pub mod bootstrap;
pub mod config;
pub mod data;
pub mod export;
pub mod learning;
pub mod metrics;
pub mod monte_carlo;
pub mod report;
pub mod runner;
pub mod sweep;

pub use config::{DataConfig, RunConfig, RunId, ValidationConfig};
pub use export::{save_artifacts, ArtifactPaths};
pub use metrics::{MaxDrawdown, PerformanceMetrics};
pub use report::render_report;
pub use runner::{run_single_backtest, BacktestResult};
pub use sweep::{retracement_level_grid, sweep, SweepRow, SweepVariant};
