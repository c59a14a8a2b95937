//! Feature normalizer
//!
//! Per-feature min/max scaling fit once over every timestep of the baseline
//! population. Out-of-range values are deliberately left unclamped so that
//! abnormal vitals stay abnormal downstream; a feature that was constant over
//! the baseline maps to 0.0 instead of dividing by zero.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::{HealioError, HealioResult, ShapeError, VitalsWindow};

/// Observed range of one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRange {
    /// Smallest baseline value
    pub min: f64,
    /// Largest baseline value
    pub max: f64,
}

impl FeatureRange {
    /// Width of the range
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// True when the baseline never varied
    pub fn is_degenerate(&self) -> bool {
        self.span().abs() < f64::EPSILON
    }

    /// Map `value` linearly so that `min -> 0` and `max -> 1`
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        (value - self.min) / self.span()
    }
}

/// Per-feature min/max fit over the baseline population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationStats {
    ranges: Vec<FeatureRange>,
}

impl NormalizationStats {
    /// Fit over every feature vector of every window
    pub fn fit(windows: &[VitalsWindow]) -> HealioResult<Self> {
        let first = windows.first().ok_or(HealioError::InsufficientData {
            required: 1,
            available: 0,
        })?;
        let n_features = first.n_features();

        let mut ranges = vec![
            FeatureRange {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            };
            n_features
        ];

        for window in windows {
            if window.n_features() != n_features {
                return Err(ShapeError::FeatureMismatch {
                    expected: n_features,
                    found: window.n_features(),
                }
                .into());
            }
            for (range, column) in ranges.iter_mut().zip(window.as_matrix().column_iter()) {
                for &value in column.iter() {
                    range.min = range.min.min(value);
                    range.max = range.max.max(value);
                }
            }
        }

        for (name, range) in feature_labels(n_features).zip(&ranges) {
            if range.is_degenerate() {
                log::warn!("baseline feature {name} is constant ({}); it will normalize to 0.0", range.min);
            }
        }

        Ok(Self { ranges })
    }

    /// Number of features the stats were fit on
    pub fn n_features(&self) -> usize {
        self.ranges.len()
    }

    /// Fitted ranges in feature order
    pub fn ranges(&self) -> &[FeatureRange] {
        &self.ranges
    }

    /// Normalize a single feature vector
    pub fn transform_vector(&self, vector: &[f64]) -> HealioResult<Vec<f64>> {
        self.check_width(vector.len())?;
        Ok(self.ranges.iter().zip(vector).map(|(r, &v)| r.scale(v)).collect())
    }

    /// Normalize every timestep of a window
    pub fn transform(&self, window: &VitalsWindow) -> HealioResult<DMatrix<f64>> {
        self.check_width(window.n_features())?;
        let data = window.as_matrix();
        Ok(DMatrix::from_fn(data.nrows(), data.ncols(), |t, f| {
            self.ranges[f].scale(data[(t, f)])
        }))
    }

    fn check_width(&self, found: usize) -> HealioResult<()> {
        if found != self.ranges.len() {
            return Err(ShapeError::FeatureMismatch {
                expected: self.ranges.len(),
                found,
            }
            .into());
        }
        Ok(())
    }
}

fn feature_labels(n_features: usize) -> impl Iterator<Item = String> {
    (0..n_features).map(|i| {
        crate::window::FEATURE_NAMES
            .get(i)
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("#{i}"))
    })
}
