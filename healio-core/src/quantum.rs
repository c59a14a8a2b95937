//! Quantum-distance scorer
//!
//! Angles are embedded as single-qubit rotations on independent qubits,
//! then the adjoint embedding of the reference angles is applied. The
//! probability of reading back the all-zero basis state is
//!
//! ```text
//! overlap(a, b) = Π_i cos²((a_i - b_i) / 2)
//! distance(a, b) = 1 - overlap(a, b)
//! ```
//!
//! which is evaluated in closed form. Differences go through `abs()` so the
//! result is bit-identical under swapping the arguments.

use nalgebra::DVector;
use serde::Serialize;

use crate::threshold::Threshold;
use crate::{HealioResult, ShapeError};

/// Probability of the all-zero state after embedding `a` then un-embedding `b`
pub fn overlap(a: &[f64], b: &[f64]) -> HealioResult<f64> {
    if a.len() != b.len() {
        return Err(ShapeError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        }
        .into());
    }
    Ok(a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let c = ((x - y).abs() / 2.0).cos();
            c * c
        })
        .product())
}

/// `1 - overlap(a, b)`, in `[0, 1]`
pub fn quantum_distance(a: &[f64], b: &[f64]) -> HealioResult<f64> {
    Ok(1.0 - overlap(a, b)?)
}

/// Distance to the baseline centroid compared against a fitted cutoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantumScorer {
    centroid: Vec<f64>,
    threshold: Threshold,
}

impl QuantumScorer {
    /// Fit the cutoff on the calibrated baseline angles
    pub fn fit(centroid: &DVector<f64>, baseline_angles: &[DVector<f64>], percentile: f64) -> HealioResult<Self> {
        let centroid: Vec<f64> = centroid.iter().copied().collect();
        let distances = baseline_angles
            .iter()
            .map(|a| quantum_distance(a.as_slice(), &centroid))
            .collect::<HealioResult<Vec<f64>>>()?;

        Ok(Self {
            threshold: Threshold::fit(&distances, percentile)?,
            centroid,
        })
    }

    /// Baseline centroid angles
    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    /// Fitted cutoff
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Distance of `angles` to the centroid
    pub fn score(&self, angles: &DVector<f64>) -> HealioResult<f64> {
        quantum_distance(angles.as_slice(), &self.centroid)
    }

    /// True when `score` exceeds the fitted cutoff
    pub fn is_anomaly(&self, score: f64) -> bool {
        self.threshold.exceeded_by(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Complex;
    use std::f64::consts::PI;

    /// State-vector simulation: RX(a_i) on every qubit, then RX(-b_i)
    fn simulate_overlap(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len();
        let mut state = vec![Complex::new(0.0, 0.0); 1 << n];
        state[0] = Complex::new(1.0, 0.0);

        for (qubit, &theta) in a.iter().enumerate() {
            apply_rx(&mut state, qubit, theta);
        }
        for (qubit, &theta) in b.iter().enumerate() {
            apply_rx(&mut state, qubit, -theta);
        }
        state[0].norm_sqr()
    }

    fn apply_rx(state: &mut [Complex<f64>], qubit: usize, theta: f64) {
        let c = Complex::new((theta / 2.0).cos(), 0.0);
        let s = Complex::new(0.0, -(theta / 2.0).sin());
        let bit = 1 << qubit;
        for i in 0..state.len() {
            if i & bit == 0 {
                let (zero, one) = (state[i], state[i | bit]);
                state[i] = c * zero + s * one;
                state[i | bit] = s * zero + c * one;
            }
        }
    }

    #[test]
    fn closed_form_matches_circuit() {
        let cases: [(&[f64], &[f64]); 4] = [
            (&[0.1, 0.2, 0.3, 0.4], &[0.4, 0.3, 0.2, 0.1]),
            (&[0.0, PI, PI / 2.0, 1.0], &[PI, 0.0, PI / 3.0, 2.5]),
            (&[3.0, -1.0, 7.0, 0.5], &[0.0, 0.0, 0.0, 0.0]),
            (&[1.2], &[2.9]),
        ];
        for (a, b) in cases {
            let closed = overlap(a, b).unwrap();
            let circuit = simulate_overlap(a, b);
            assert!((closed - circuit).abs() < 1e-12, "{closed} vs {circuit}");
        }
    }

    #[test]
    fn identity_and_symmetry() {
        let a = [0.3, 1.7, 2.2, 3.0];
        let b = [1.1, 0.2, 2.9, 0.0];
        assert_eq!(quantum_distance(&a, &a).unwrap(), 0.0);
        assert_eq!(quantum_distance(&a, &b).unwrap(), quantum_distance(&b, &a).unwrap());
    }

    #[test]
    fn opposite_angles_are_maximally_distant() {
        let d = quantum_distance(&[0.0], &[PI]).unwrap();
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(overlap(&[0.0, 1.0], &[0.0]).is_err());
    }

    #[test]
    fn scorer_flags_far_points() {
        let baseline: Vec<DVector<f64>> = (0..=20)
            .map(|i| DVector::from_element(2, PI / 2.0 + (i as f64 - 10.0) * 0.01))
            .collect();
        let centroid = crate::angles::centroid(&baseline).unwrap();
        let scorer = QuantumScorer::fit(&centroid, &baseline, 97.0).unwrap();

        let near = scorer.score(&centroid).unwrap();
        let far = scorer.score(&DVector::from_element(2, 0.0)).unwrap();
        assert!(!scorer.is_anomaly(near));
        assert!(scorer.is_anomaly(far));
        assert_eq!(scorer.threshold().percentile, Some(97.0));
    }
}
