//! Serializable run configuration.
//!
//! A `RunConfig` captures everything needed to reproduce a backtest:
//! symbol, engine/risk settings, strategy list, and the data source. Two
//! identical configs hash to the same content-addressed run id, so cached
//! results and artifacts can be shared.
//!
//! Monetary and fractional fields are scaled integers, like everywhere
//! else: `initial_capital = 100_000_000_000` is $100,000, `commission =
//! 1_000` is 0.1%.

use fiblab_core::config::EngineConfig;
use fiblab_core::error::ConfigError;
use fiblab_core::series::SplitEvent;
use fiblab_core::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Where the bars come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataConfig {
    /// CSV file with `date,open,high,low,close,volume` rows.
    Csv { path: PathBuf },
    /// Deterministic synthetic walk (for demos and tests).
    Synthetic { bars: usize, seed: u64 },
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig::Synthetic {
            bars: 500,
            seed: 42,
        }
    }
}

/// Statistical validation settings (optional per run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub resamples: usize,
    pub seed: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            resamples: 1000,
            seed: 42,
        }
    }
}

/// Full configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub symbol: String,
    #[serde(default)]
    pub engine: EngineConfig,
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub data: DataConfig,
    /// Known splits to back-adjust before the run.
    #[serde(default)]
    pub splits: Vec<SplitEvent>,
    #[serde(default)]
    pub validation: Option<ValidationConfig>,
}

impl RunConfig {
    /// Validate everything the engine would reject, before any data loads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        for strategy in &self.strategies {
            strategy.validate()?;
        }
        Ok(())
    }

    /// Deterministic content hash: identical configs share artifacts.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiblab_core::strategy::{BreakoutParams, RetracementParams};

    fn sample_config() -> RunConfig {
        RunConfig {
            symbol: "SPY".into(),
            engine: EngineConfig::default(),
            strategies: vec![
                Strategy::FibonacciRetracement(RetracementParams::default()),
                Strategy::Breakout(BreakoutParams::default()),
            ],
            data: DataConfig::default(),
            splits: Vec::new(),
            validation: None,
        }
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = sample_config();
        let b = sample_config();
        assert_eq!(a.run_id(), b.run_id());
    }

    #[test]
    fn run_id_changes_with_config() {
        let a = sample_config();
        let mut b = sample_config();
        b.engine.commission = 2_000;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn toml_roundtrip() {
        let config = sample_config();
        let text = toml::to_string(&config).unwrap();
        let parsed = RunConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn parses_a_handwritten_config() {
        let text = r#"
            symbol = "SPY"

            [engine]
            initial_capital = 100000000000
            commission = 1000
            slippage = 1000

            [[strategies]]
            type = "fibonacci_retracement"
            lookback = 30
            tolerance = 5000

            [[strategies]]
            type = "lucas_time_exit"

            [data]
            source = "synthetic"
            bars = 400
            seed = 7
        "#;
        let config = RunConfig::from_toml_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.symbol, "SPY");
        assert_eq!(config.strategies.len(), 2);
        match &config.strategies[0] {
            Strategy::FibonacciRetracement(p) => assert_eq!(p.lookback, 30),
            other => panic!("wrong strategy: {other:?}"),
        }
        assert_eq!(
            config.data,
            DataConfig::Synthetic { bars: 400, seed: 7 }
        );
    }

    #[test]
    fn empty_strategy_list_rejected() {
        let mut config = sample_config();
        config.strategies.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoStrategies)));
    }
}
