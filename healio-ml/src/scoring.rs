//! Anomaly score calculation
//!
//! Converts the forest's mean path length into the normalized isolation score
//! in (0, 1]: values near 1 are isolated quickly (anomalous), values well
//! below 0.5 sit deep inside the training distribution.

use crate::c_factor;

/// Anomaly score result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyScore {
    /// Normalized isolation score (0.5 = indistinct, 1.0 = anomaly)
    pub score: f64,
    /// Average path length across trees
    pub avg_path_length: f64,
    /// Number of trees used
    pub num_trees: usize,
}

impl AnomalyScore {
    /// Create a new anomaly score
    pub fn new(score: f64, avg_path_length: f64, num_trees: usize) -> Self {
        Self {
            score,
            avg_path_length,
            num_trees,
        }
    }

    /// Check if score indicates an anomaly
    pub fn is_anomaly(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

/// Calculate anomaly score from path lengths
///
/// Uses the formula: score = 2^(-E(h(x))/c(ψ))
/// where E(h(x)) is expected path length and c(ψ) is the average path length
/// for the per-tree subsample size ψ
pub fn calculate_anomaly_score(avg_path_length: f64, subsample_size: usize) -> f64 {
    let expected_path = c_factor(subsample_size);
    if expected_path == 0.0 {
        return 0.5;
    }

    2.0_f64.powf(-avg_path_length / expected_path)
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in percent (0-100). Returns `None` for an empty slice. NaN values
/// sort last.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 100.0);
    let position = (sorted.len() - 1) as f64 * q / 100.0;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
