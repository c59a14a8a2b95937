//! Percentile cutoffs derived from baseline score distributions

use healio_ml::scoring::percentile;
use serde::Serialize;

use crate::{HealioError, HealioResult};

/// Scalar cutoff fit once on baseline scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Threshold {
    /// Cutoff value; scores strictly above it are anomalous
    pub value: f64,
    /// Baseline percentile the cutoff was taken at, if fit
    pub percentile: Option<f64>,
}

impl Threshold {
    /// `percentile`-th percentile (linear interpolation) of `scores`
    pub fn fit(scores: &[f64], percentile_rank: f64) -> HealioResult<Self> {
        let value = percentile(scores, percentile_rank).ok_or(HealioError::InsufficientData {
            required: 1,
            available: 0,
        })?;
        Ok(Self {
            value,
            percentile: Some(percentile_rank),
        })
    }

    /// Fixed cutoff
    pub fn at(value: f64) -> Self {
        Self {
            value,
            percentile: None,
        }
    }

    /// True when `score` lies strictly above the cutoff
    pub fn exceeded_by(&self, score: f64) -> bool {
        score > self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_ranks() {
        let scores: Vec<f64> = (0..=100).map(f64::from).collect();
        let t = Threshold::fit(&scores, 97.0).unwrap();
        assert!((t.value - 97.0).abs() < 1e-12);

        let t = Threshold::fit(&[0.0, 1.0], 95.0).unwrap();
        assert!((t.value - 0.95).abs() < 1e-12);
    }

    #[test]
    fn comparison_is_strict() {
        let t = Threshold::at(0.5);
        assert!(!t.exceeded_by(0.5));
        assert!(t.exceeded_by(0.500_000_1));
        assert!(!t.exceeded_by(f64::NAN));
    }

    #[test]
    fn empty_scores_cannot_be_fit() {
        assert!(matches!(
            Threshold::fit(&[], 97.0),
            Err(HealioError::InsufficientData { .. })
        ));
    }
}
