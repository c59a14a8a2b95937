//! Pipeline configuration
//!
//! Every knob of the calibration phase lives here. Defaults reproduce the
//! reference deployment (60-step windows of 5 vitals, 128-wide embeddings,
//! 4 qubits, 97th/95th percentile thresholds). Configurations can be loaded
//! from JSON; omitted fields take their defaults.
//!
//! ```rust
//! use healio_core::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{ "timesteps": 30, "forest": { "num_trees": 100 } }"#).unwrap();
//! assert_eq!(config.timesteps, 30);
//! assert_eq!(config.forest.num_trees, 100);
//! assert_eq!(config.n_qubits, 4);
//! ```

use std::path::Path;

use healio_ml::ForestConfig;
use serde::{Deserialize, Serialize};

use crate::{HealioError, HealioResult};

/// Risk regressor training settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTrainingConfig {
    /// Widths of the hidden layers
    pub hidden_dims: Vec<usize>,
    /// Passes over the baseline population
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Seed for weight init, shuffling and proxy targets
    pub seed: u64,
}

impl Default for RiskTrainingConfig {
    fn default() -> Self {
        Self {
            hidden_dims: vec![64, 32],
            epochs: 5,
            batch_size: 32,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window length in samples
    pub timesteps: usize,
    /// Vitals per sample
    pub n_features: usize,
    /// Width of the encoder's first layer
    pub hidden_dim: usize,
    /// Width of the window embedding
    pub embedding_dim: usize,
    /// Retained components (one qubit each)
    pub n_qubits: usize,
    /// Seed for encoder weights
    pub encoder_seed: u64,
    /// Minimum encoder pre-activation over the baseline population
    pub activation_margin: f64,
    /// Baseline percentile of quantum distances used as threshold
    pub quantum_percentile: f64,
    /// Baseline percentile of classical scores used as threshold
    pub classical_percentile: f64,
    /// Outlier ensemble settings
    pub forest: ForestConfig,
    /// Risk regressor settings
    pub risk: RiskTrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timesteps: 60,
            n_features: 5,
            hidden_dim: 64,
            embedding_dim: 128,
            n_qubits: 4,
            encoder_seed: 42,
            activation_margin: 0.05,
            quantum_percentile: 97.0,
            classical_percentile: 95.0,
            forest: ForestConfig::default(),
            risk: RiskTrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> HealioResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> HealioResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check every value is usable
    pub fn validate(&self) -> HealioResult<()> {
        if self.timesteps == 0 {
            return Err(HealioError::InvalidConfig("timesteps must be positive"));
        }
        if self.n_features == 0 {
            return Err(HealioError::InvalidConfig("n_features must be positive"));
        }
        if self.hidden_dim == 0 || self.embedding_dim == 0 {
            return Err(HealioError::InvalidConfig("encoder widths must be positive"));
        }
        if self.n_qubits == 0 || self.n_qubits > self.embedding_dim {
            return Err(HealioError::InvalidConfig("n_qubits must be in 1..=embedding_dim"));
        }
        if !(self.activation_margin.is_finite() && self.activation_margin >= 0.0) {
            return Err(HealioError::InvalidConfig("activation_margin must be finite and non-negative"));
        }
        for percentile in [self.quantum_percentile, self.classical_percentile] {
            if !(percentile > 0.0 && percentile <= 100.0) {
                return Err(HealioError::InvalidConfig("threshold percentiles must be in (0, 100]"));
            }
        }
        self.forest.validate()?;
        if self.risk.hidden_dims.iter().any(|&d| d == 0) {
            return Err(HealioError::InvalidConfig("risk hidden layers must be non-empty"));
        }
        if self.risk.batch_size == 0 {
            return Err(HealioError::InvalidConfig("risk batch_size must be positive"));
        }
        if !(self.risk.learning_rate.is_finite() && self.risk.learning_rate > 0.0) {
            return Err(HealioError::InvalidConfig("risk learning_rate must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.timesteps, 60);
        assert_eq!(config.n_features, 5);
        assert_eq!(config.embedding_dim, 128);
        assert_eq!(config.n_qubits, 4);
        assert_eq!(config.forest.num_trees, 300);
        assert_eq!(config.risk.hidden_dims, vec![64, 32]);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let too_many_qubits = PipelineConfig {
            n_qubits: 129,
            ..PipelineConfig::default()
        };
        assert!(matches!(too_many_qubits.validate(), Err(HealioError::InvalidConfig(_))));

        let bad_percentile = PipelineConfig {
            quantum_percentile: 0.0,
            ..PipelineConfig::default()
        };
        assert!(bad_percentile.validate().is_err());

        let mut bad_forest = PipelineConfig::default();
        bad_forest.forest.num_trees = 0;
        assert!(matches!(bad_forest.validate(), Err(HealioError::Forest(_))));
    }

    #[test]
    fn json_round_trip_through_file() {
        let mut config = PipelineConfig::default();
        config.timesteps = 30;
        config.risk.epochs = 2;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&config).unwrap().as_bytes()).unwrap();

        let loaded = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(HealioError::Json(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "n_features": 0 }"#),
            Err(HealioError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_file("/nonexistent/healio.json"),
            Err(HealioError::ConfigIo(_))
        ));
    }
}
