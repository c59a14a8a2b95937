//! Classical outlier scorer
//!
//! Isolation forest over window embeddings. The score is the forest's
//! anomaly score minus its contamination offset (higher is more anomalous),
//! and the cutoff is a baseline percentile of that score.

use healio_ml::{ForestConfig, ForestStats, IsolationForest, Sample};
use nalgebra::DVector;

use crate::threshold::Threshold;
use crate::{HealioError, HealioResult, ShapeError};

/// Fitted isolation forest plus its baseline cutoff
#[derive(Debug, Clone)]
pub struct ClassicalScorer {
    forest: IsolationForest,
    threshold: Threshold,
    dim: usize,
}

impl ClassicalScorer {
    /// Fit the forest and the cutoff on baseline embeddings
    pub fn fit(embeddings: &[DVector<f64>], config: &ForestConfig, percentile: f64) -> HealioResult<Self> {
        let dim = embeddings.first().map(|e| e.len()).ok_or(HealioError::InsufficientData {
            required: 1,
            available: 0,
        })?;
        let samples: Vec<Sample> = embeddings.iter().map(|e| Sample::from_slice(e.as_slice())).collect();

        let mut forest = IsolationForest::new(config.clone());
        forest.fit(&samples)?;

        let scores: Vec<f64> = samples.iter().map(|s| forest.outlier_score(s)).collect();
        let threshold = Threshold::fit(&scores, percentile)?;

        Ok(Self { forest, threshold, dim })
    }

    /// Outlier score of one embedding
    pub fn score(&self, embedding: &DVector<f64>) -> HealioResult<f64> {
        if embedding.len() != self.dim {
            return Err(ShapeError::DimensionMismatch {
                expected: self.dim,
                found: embedding.len(),
            }
            .into());
        }
        Ok(self.forest.outlier_score(&Sample::from_slice(embedding.as_slice())))
    }

    /// True when `score` exceeds the fitted cutoff
    pub fn is_anomaly(&self, score: f64) -> bool {
        self.threshold.exceeded_by(score)
    }

    /// Fitted cutoff
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Contamination offset subtracted from raw anomaly scores
    pub fn offset(&self) -> f64 {
        self.forest.offset()
    }

    /// Forest size summary
    pub fn stats(&self) -> ForestStats {
        self.forest.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healio_ml::Rng;

    fn cloud(n: usize) -> Vec<DVector<f64>> {
        let mut rng = Rng::new(21);
        (0..n)
            .map(|_| DVector::from_fn(3, |_, _| 1.0 + rng.next_gaussian() * 0.1))
            .collect()
    }

    fn config() -> ForestConfig {
        ForestConfig {
            num_trees: 100,
            sample_size: 64,
            max_depth: 6,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn far_embedding_scores_above_threshold() {
        let scorer = ClassicalScorer::fit(&cloud(200), &config(), 95.0).unwrap();

        let center = scorer.score(&DVector::from_element(3, 1.0)).unwrap();
        let far = scorer.score(&DVector::from_element(3, 5.0)).unwrap();

        assert!(far > center);
        assert!(!scorer.is_anomaly(center));
        assert!(scorer.is_anomaly(far));
    }

    #[test]
    fn baseline_threshold_sits_near_zero() {
        // Offset and cutoff are both 95th percentiles of the same scores
        let scorer = ClassicalScorer::fit(&cloud(150), &config(), 95.0).unwrap();
        assert!(scorer.threshold().value.abs() < 1e-12);
        assert!(scorer.offset() > 0.0);
        assert_eq!(scorer.stats().num_trees, 100);
    }

    #[test]
    fn scoring_is_deterministic() {
        let a = ClassicalScorer::fit(&cloud(100), &config(), 95.0).unwrap();
        let b = ClassicalScorer::fit(&cloud(100), &config(), 95.0).unwrap();
        let probe = DVector::from_element(3, 1.3);
        assert_eq!(a.score(&probe).unwrap(), b.score(&probe).unwrap());
    }

    #[test]
    fn rejects_wrong_dimension_and_empty_baseline() {
        let scorer = ClassicalScorer::fit(&cloud(50), &config(), 95.0).unwrap();
        assert!(matches!(
            scorer.score(&DVector::<f64>::zeros(4)),
            Err(HealioError::Shape(ShapeError::DimensionMismatch { expected: 3, found: 4 }))
        ));
        assert!(ClassicalScorer::fit(&[], &config(), 95.0).is_err());
    }
}
