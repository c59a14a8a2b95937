//! Angle calibrator
//!
//! Maps each reduced component linearly from its baseline range onto
//! `[0, π]`, the rotation-angle domain of the overlap metric. Like the
//! feature normalizer it does not clamp, and a component that was constant
//! over the baseline maps to 0.0.

use std::f64::consts::PI;

use nalgebra::DVector;
use serde::Serialize;

use crate::normalizer::FeatureRange;
use crate::{HealioError, HealioResult, ShapeError};

/// Per-component baseline ranges
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleCalibration {
    ranges: Vec<FeatureRange>,
}

impl AngleCalibration {
    /// Fit on baseline reduced components
    pub fn fit(reduced: &[DVector<f64>]) -> HealioResult<Self> {
        let first = reduced.first().ok_or(HealioError::InsufficientData {
            required: 1,
            available: 0,
        })?;
        let dim = first.len();

        let mut ranges = vec![
            FeatureRange {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            };
            dim
        ];
        for r in reduced {
            if r.len() != dim {
                return Err(ShapeError::DimensionMismatch {
                    expected: dim,
                    found: r.len(),
                }
                .into());
            }
            for (range, &value) in ranges.iter_mut().zip(r.iter()) {
                range.min = range.min.min(value);
                range.max = range.max.max(value);
            }
        }

        for (i, range) in ranges.iter().enumerate() {
            if range.is_degenerate() {
                log::warn!("reduced component {i} is constant over the baseline; its angle is pinned to 0.0");
            }
        }

        Ok(Self { ranges })
    }

    /// Number of calibrated components
    pub fn dim(&self) -> usize {
        self.ranges.len()
    }

    /// Fitted ranges in component order
    pub fn ranges(&self) -> &[FeatureRange] {
        &self.ranges
    }

    /// Rotation angles for one reduced vector
    pub fn transform(&self, reduced: &DVector<f64>) -> HealioResult<DVector<f64>> {
        if reduced.len() != self.dim() {
            return Err(ShapeError::DimensionMismatch {
                expected: self.dim(),
                found: reduced.len(),
            }
            .into());
        }
        Ok(DVector::from_iterator(
            self.dim(),
            self.ranges.iter().zip(reduced.iter()).map(|(r, &v)| r.scale(v) * PI),
        ))
    }
}

/// Component-wise mean of calibrated baseline angles
pub fn centroid(angles: &[DVector<f64>]) -> HealioResult<DVector<f64>> {
    let first = angles.first().ok_or(HealioError::InsufficientData {
        required: 1,
        available: 0,
    })?;
    let mut sum = DVector::<f64>::zeros(first.len());
    for a in angles {
        if a.len() != first.len() {
            return Err(ShapeError::DimensionMismatch {
                expected: first.len(),
                found: a.len(),
            }
            .into());
        }
        sum += a;
    }
    Ok(sum / angles.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors(rows: &[[f64; 2]]) -> Vec<DVector<f64>> {
        rows.iter().map(|r| DVector::from_row_slice(r.as_slice())).collect()
    }

    #[test]
    fn maps_baseline_range_onto_zero_to_pi() {
        let baseline = vectors(&[[-2.0, 10.0], [0.0, 20.0], [2.0, 30.0]]);
        let calibration = AngleCalibration::fit(&baseline).unwrap();

        let low = calibration.transform(&baseline[0]).unwrap();
        let mid = calibration.transform(&baseline[1]).unwrap();
        let high = calibration.transform(&baseline[2]).unwrap();

        assert_eq!(low.as_slice(), &[0.0, 0.0]);
        assert!((mid[0] - PI / 2.0).abs() < 1e-12);
        assert!((high[1] - PI).abs() < 1e-12);
    }

    #[test]
    fn outside_range_is_not_clamped() {
        let calibration = AngleCalibration::fit(&vectors(&[[0.0, 0.0], [1.0, 1.0]])).unwrap();
        let angles = calibration.transform(&DVector::from_vec(vec![2.0, -1.0])).unwrap();
        assert!((angles[0] - 2.0 * PI).abs() < 1e-12);
        assert!((angles[1] + PI).abs() < 1e-12);
    }

    #[test]
    fn constant_component_is_pinned() {
        let calibration = AngleCalibration::fit(&vectors(&[[0.0, 4.0], [1.0, 4.0]])).unwrap();
        let angles = calibration.transform(&DVector::from_vec(vec![0.5, 100.0])).unwrap();
        assert_eq!(angles[1], 0.0);
    }

    #[test]
    fn centroid_is_mean() {
        let c = centroid(&vectors(&[[0.0, 1.0], [2.0, 3.0]])).unwrap();
        assert_eq!(c.as_slice(), &[1.0, 2.0]);
        assert!(centroid(&[]).is_err());
    }

    #[test]
    fn rejects_wrong_dimension() {
        let calibration = AngleCalibration::fit(&vectors(&[[0.0, 0.0], [1.0, 1.0]])).unwrap();
        assert!(matches!(
            calibration.transform(&DVector::<f64>::zeros(3)),
            Err(HealioError::Shape(ShapeError::DimensionMismatch { expected: 2, found: 3 }))
        ));
    }
}
