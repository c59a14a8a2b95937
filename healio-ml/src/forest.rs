//! Isolation Forest implementation
//!
//! Combines many isolation trees, each grown on its own random subsample, and
//! calibrates a contamination offset on the training data so that
//! [`IsolationForest::outlier_score`] is positive for the most isolated
//! `contamination` fraction of the training set.

use serde::{Deserialize, Serialize};

use crate::{
    calculate_anomaly_score, scoring::percentile, AnomalyScore, IsolationTree, MLError,
    MLResult, Rng, Sample, TreeConfig, DEFAULT_NUM_TREES, DEFAULT_SAMPLE_SIZE,
};

/// Configuration for Isolation Forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub num_trees: usize,
    /// Sample size for each tree
    pub sample_size: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Random seed
    pub seed: u64,
    /// Expected fraction of outliers in the training data
    pub contamination: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            // ceil(log2(256))
            max_depth: 8,
            seed: 42,
            contamination: 0.05,
        }
    }
}

impl ForestConfig {
    /// Check that the configuration can produce a usable forest
    pub fn validate(&self) -> MLResult<()> {
        if self.num_trees == 0 {
            return Err(MLError::InvalidConfig("num_trees must be positive"));
        }
        if self.sample_size < 2 {
            return Err(MLError::InvalidConfig("sample_size must be at least 2"));
        }
        if self.max_depth == 0 {
            return Err(MLError::InvalidConfig("max_depth must be positive"));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(MLError::InvalidConfig("contamination must be in (0, 0.5]"));
        }
        Ok(())
    }
}

/// Isolation Forest for anomaly detection
#[derive(Debug, Clone)]
pub struct IsolationForest {
    /// Individual trees
    trees: Vec<IsolationTree>,
    /// Configuration
    config: ForestConfig,
    /// Random number generator used for subsampling
    rng: Rng,
    /// Number of samples used for training
    num_samples: usize,
    /// Subsample size each tree was grown on (ψ)
    subsample_size: usize,
    /// Training-score percentile subtracted by `outlier_score`
    offset: f64,
}

impl IsolationForest {
    /// Create a new Isolation Forest
    pub fn new(config: ForestConfig) -> Self {
        let seed = config.seed;
        Self {
            trees: Vec::new(),
            config,
            rng: Rng::new(seed),
            num_samples: 0,
            subsample_size: 0,
            offset: 0.0,
        }
    }

    /// Train the forest on samples
    pub fn fit(&mut self, samples: &[Sample]) -> MLResult<()> {
        self.config.validate()?;
        if samples.is_empty() {
            return Err(MLError::InsufficientData);
        }

        self.rng = Rng::new(self.config.seed);
        self.num_samples = samples.len();
        self.subsample_size = self.config.sample_size.min(samples.len());
        self.trees.clear();

        for i in 0..self.config.num_trees {
            let tree_config = TreeConfig {
                max_depth: self.config.max_depth,
                seed: self.config.seed.wrapping_add(i as u64),
            };

            let mut tree = IsolationTree::new(tree_config);
            let tree_samples = self.sample_subset(samples);
            tree.fit(&tree_samples)?;

            self.trees.push(tree);
        }

        let training_scores: Vec<f64> = samples
            .iter()
            .map(|sample| self.anomaly_score(sample).score)
            .collect();
        self.offset = percentile(&training_scores, 100.0 * (1.0 - self.config.contamination))
            .ok_or(MLError::InsufficientData)?;

        log::debug!(
            "isolation forest fit: trees={} samples={} psi={} offset={:.6}",
            self.trees.len(),
            self.num_samples,
            self.subsample_size,
            self.offset
        );

        Ok(())
    }

    /// Sample a subset of data for tree training
    fn sample_subset<'a>(&mut self, samples: &'a [Sample]) -> Vec<&'a Sample> {
        let sample_size = self.subsample_size;

        // If sample size >= data size, use all data
        if sample_size >= samples.len() {
            return samples.iter().collect();
        }

        // Partial Fisher-Yates shuffle, sampling without replacement
        let mut indices: Vec<usize> = (0..samples.len()).collect();
        for i in 0..sample_size {
            let j = i + self.rng.next_range(samples.len() - i);
            indices.swap(i, j);
        }

        indices[..sample_size].iter().map(|&i| &samples[i]).collect()
    }

    /// Calculate anomaly score for a sample
    pub fn anomaly_score(&self, sample: &Sample) -> AnomalyScore {
        if self.trees.is_empty() {
            return AnomalyScore::new(0.5, 0.0, 0);
        }

        let total_path_length: f64 = self.trees.iter()
            .map(|tree| tree.path_length(sample))
            .sum();

        let avg_path_length = total_path_length / self.trees.len() as f64;
        let score = calculate_anomaly_score(avg_path_length, self.subsample_size);

        AnomalyScore::new(score, avg_path_length, self.trees.len())
    }

    /// Outlier score: anomaly score minus the contamination offset
    ///
    /// Higher means more anomalous; positive values fall inside the most
    /// isolated `contamination` fraction of the training data.
    pub fn outlier_score(&self, sample: &Sample) -> f64 {
        self.anomaly_score(sample).score - self.offset
    }

    /// Contamination offset learned at fit time
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Get forest statistics
    pub fn stats(&self) -> ForestStats {
        let total_nodes: usize = self.trees.iter()
            .map(|t| t.node_count())
            .sum();

        let max_depth = self.trees.iter()
            .map(|t| t.depth())
            .max()
            .unwrap_or(0);

        ForestStats {
            num_trees: self.trees.len(),
            total_nodes,
            max_depth,
            num_samples: self.num_samples,
            subsample_size: self.subsample_size,
            offset: self.offset,
        }
    }
}

/// Forest statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForestStats {
    /// Number of trees
    pub num_trees: usize,
    /// Total nodes across all trees
    pub total_nodes: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Number of training samples
    pub num_samples: usize,
    /// Per-tree subsample size
    pub subsample_size: usize,
    /// Contamination offset
    pub offset: f64,
}
