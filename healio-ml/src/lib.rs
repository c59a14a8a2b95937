//! Isolation Forest for Vital-Sign Embeddings
//!
//! ## Overview
//!
//! This crate provides the classical half of Heal.io's anomaly detection: an
//! ensemble of isolation trees fit once on embeddings of a baseline (assumed
//! normal) population and queried many times at inference.
//!
//! ## Why Isolation Forest?
//!
//! 1. **Unsupervised**: Only normal baseline data is needed
//! 2. **Fast Inference**: O(log ψ) per tree per prediction
//! 3. **Dimension Friendly**: Works directly on 128-wide embeddings
//! 4. **Deterministic**: Every random choice flows from a seeded [`Rng`]
//!
//! ## Algorithm Overview
//!
//! The algorithm isolates anomalies by randomly partitioning data:
//! ```text
//! Normal points: Need many partitions to isolate
//! Anomalies: Isolated with few partitions
//!
//! Anomaly Score = 2^(-E[h(x)] / c(ψ))
//! ```
//!
//! where `h(x)` is the path length of `x` in one tree, `E[h(x)]` its mean over
//! the forest and `c(ψ)` the average path length of an unsuccessful binary
//! search over the subsample size `ψ`.
//!
//! ```no_run
//! use healio_ml::{ForestConfig, IsolationForest, Sample};
//!
//! let baseline: Vec<Sample> = (0..64)
//!     .map(|i| Sample::new(vec![20.0 + (i % 8) as f64 * 0.1, 50.0 + (i / 8) as f64 * 0.2]))
//!     .collect();
//!
//! let mut forest = IsolationForest::new(ForestConfig::default());
//! forest.fit(&baseline).unwrap();
//!
//! let score = forest.anomaly_score(&Sample::new(vec![35.0, 90.0]));
//! if score.is_anomaly(0.6) {
//!     // Unusual combination
//! }
//! ```
//!
//! ## Performance Characteristics
//!
//! | Operation       | Time         | Memory   |
//! |-----------------|--------------|----------|
//! | Train tree      | O(ψ log ψ)   | O(ψ)     |
//! | Score sample    | O(T log ψ)   | O(1)     |

#![deny(unsafe_code)]

pub mod forest;
pub mod node;
pub mod scoring;
pub mod tree;

pub use forest::{ForestConfig, ForestStats, IsolationForest};
pub use node::{c_factor, Node, NodeType};
pub use scoring::{calculate_anomaly_score, AnomalyScore};
pub use tree::{IsolationTree, TreeConfig};

use thiserror::Error;

/// Default subsample size per tree
pub const DEFAULT_SAMPLE_SIZE: usize = 256;

/// Default number of trees in the forest
pub const DEFAULT_NUM_TREES: usize = 300;

/// Result type for ML operations
pub type MLResult<T> = Result<T, MLError>;

/// Errors raised while fitting or querying the forest
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MLError {
    /// No samples to train on
    #[error("Insufficient data to fit the model")]
    InsufficientData,

    /// Feature index not present in a sample, or samples of mixed width
    #[error("Invalid feature index or inconsistent sample width")]
    InvalidFeature,

    /// Configuration cannot produce a usable model
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A single feature vector presented to the forest
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Feature values
    pub features: Vec<f64>,
}

impl Sample {
    /// Wrap a feature vector
    pub fn new(features: Vec<f64>) -> Self {
        Self { features }
    }

    /// Copy a feature slice
    pub fn from_slice(features: &[f64]) -> Self {
        Self {
            features: features.to_vec(),
        }
    }

    /// Get a feature by index
    pub fn get_feature(&self, index: usize) -> Option<f64> {
        self.features.get(index).copied()
    }

    /// Number of features
    pub fn num_features(&self) -> usize {
        self.features.len()
    }
}

impl From<Vec<f64>> for Sample {
    fn from(features: Vec<f64>) -> Self {
        Self::new(features)
    }
}

/// Small seeded generator (SplitMix64)
///
/// Every stochastic step of calibration draws from one of these, so a fixed
/// seed reproduces the same forest, encoder weights and risk model bit for bit.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next raw 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform index in [0, n)
    pub fn next_range(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }

    /// Uniform value in [min, max)
    pub fn next_f64_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Standard normal draw (Box-Muller, cosine branch)
    pub fn next_gaussian(&mut self) -> f64 {
        let u1 = loop {
            let u = self.next_f64();
            if u > 0.0 {
                break u;
            }
        };
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * core::f64::consts::PI * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_reproducible() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn rng_ranges() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));

            let i = rng.next_range(13);
            assert!(i < 13);

            let y = rng.next_f64_range(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&y));
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn gaussian_moments() {
        let mut rng = Rng::new(1234);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| rng.next_gaussian()).collect();

        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }

    #[test]
    fn sample_accessors() {
        let sample = Sample::from_slice(&[1.0, 2.0]);
        assert_eq!(sample.num_features(), 2);
        assert_eq!(sample.get_feature(1), Some(2.0));
        assert_eq!(sample.get_feature(2), None);
    }
}
