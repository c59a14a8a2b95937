//! Dimensionality reducer
//!
//! Principal component projection of window embeddings onto the
//! `n_qubits` directions of largest baseline variance. The covariance is
//! decomposed with `nalgebra::SymmetricEigen`; components are ordered by
//! decreasing eigenvalue and their signs fixed so the largest-magnitude
//! loading is positive, making the fit reproducible across platforms.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::Serialize;

use crate::{HealioError, HealioResult, ShapeError};

/// Variance captured by the retained components
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainedVariance {
    /// Eigenvalue of each retained component
    pub variance: Vec<f64>,
    /// Share of the total baseline variance per component
    pub ratio: Vec<f64>,
}

impl ExplainedVariance {
    /// Total share captured by all retained components
    pub fn total_ratio(&self) -> f64 {
        self.ratio.iter().sum()
    }
}

/// Fitted linear projection `P (e - mean)`
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalProjection {
    mean: DVector<f64>,
    /// One component per row
    components: DMatrix<f64>,
    explained: ExplainedVariance,
}

impl PrincipalProjection {
    /// Fit on baseline embeddings
    pub fn fit(embeddings: &[DVector<f64>], n_components: usize) -> HealioResult<Self> {
        if embeddings.len() < 2 {
            return Err(HealioError::InsufficientData {
                required: 2,
                available: embeddings.len(),
            });
        }
        let dim = embeddings[0].len();
        if n_components == 0 || n_components > dim {
            return Err(HealioError::InvalidConfig("component count must be in 1..=embedding width"));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
            return Err(ShapeError::DimensionMismatch {
                expected: dim,
                found: bad.len(),
            }
            .into());
        }

        let n = embeddings.len() as f64;
        let mean = embeddings.iter().fold(DVector::<f64>::zeros(dim), |acc, e| acc + e) / n;

        let mut covariance = DMatrix::<f64>::zeros(dim, dim);
        for e in embeddings {
            let centered = e - &mean;
            covariance.ger(1.0, &centered, &centered, 1.0);
        }
        covariance /= n - 1.0;

        let eigen = SymmetricEigen::new(covariance);

        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let total: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let mut components = DMatrix::<f64>::zeros(n_components, dim);
        let mut variance = Vec::with_capacity(n_components);
        let mut ratio = Vec::with_capacity(n_components);

        for (row, &index) in order.iter().take(n_components).enumerate() {
            let mut direction = eigen.eigenvectors.column(index).into_owned();
            let pivot = direction.iamax();
            if direction[pivot] < 0.0 {
                direction.neg_mut();
            }
            components.set_row(row, &direction.transpose());

            let value = eigen.eigenvalues[index].max(0.0);
            variance.push(value);
            ratio.push(if total > 0.0 { value / total } else { 0.0 });
        }

        Ok(Self {
            mean,
            components,
            explained: ExplainedVariance { variance, ratio },
        })
    }

    /// Embedding width the projection was fit on
    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    /// Number of retained components
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Retained variance summary
    pub fn explained_variance(&self) -> &ExplainedVariance {
        &self.explained
    }

    /// Coordinates of `embedding` along the retained components
    pub fn transform(&self, embedding: &DVector<f64>) -> HealioResult<DVector<f64>> {
        if embedding.len() != self.input_dim() {
            return Err(ShapeError::DimensionMismatch {
                expected: self.input_dim(),
                found: embedding.len(),
            }
            .into());
        }
        Ok(&self.components * (embedding - &self.mean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healio_ml::Rng;

    /// Points stretched along (1, 1, 0) with a little noise elsewhere
    fn elongated(n: usize) -> Vec<DVector<f64>> {
        let mut rng = Rng::new(9);
        (0..n)
            .map(|_| {
                let t = rng.next_gaussian() * 10.0;
                DVector::from_vec(vec![
                    t + rng.next_gaussian() * 0.1,
                    t + rng.next_gaussian() * 0.1,
                    rng.next_gaussian(),
                ])
            })
            .collect()
    }

    #[test]
    fn first_component_follows_dominant_direction() {
        let projection = PrincipalProjection::fit(&elongated(200), 2).unwrap();
        let first = projection.components.row(0);
        let expected = 1.0 / 2f64.sqrt();

        assert!((first[0] - expected).abs() < 0.01);
        assert!((first[1] - expected).abs() < 0.01);
        assert!(first[2].abs() < 0.05);

        let explained = projection.explained_variance();
        assert!(explained.variance[0] > explained.variance[1]);
        assert!(explained.ratio[0] > 0.9);
        assert!(explained.total_ratio() <= 1.0 + 1e-12);
    }

    #[test]
    fn components_are_orthonormal() {
        let projection = PrincipalProjection::fit(&elongated(100), 3).unwrap();
        let gram = &projection.components * projection.components.transpose();
        assert!((gram - DMatrix::identity(3, 3)).amax() < 1e-9);
    }

    #[test]
    fn baseline_projections_are_centered() {
        let data = elongated(50);
        let projection = PrincipalProjection::fit(&data, 2).unwrap();
        let sum = data
            .iter()
            .map(|e| projection.transform(e).unwrap())
            .fold(DVector::<f64>::zeros(2), |acc, r| acc + r);
        assert!(sum.amax() < 1e-8);
    }

    #[test]
    fn signs_are_fixed() {
        let projection = PrincipalProjection::fit(&elongated(80), 3).unwrap();
        for row in projection.components.row_iter() {
            let column = row.transpose();
            assert!(column[column.iamax()] > 0.0);
        }
    }

    #[test]
    fn validates_input() {
        let data = elongated(10);
        assert!(matches!(
            PrincipalProjection::fit(&data[..1], 1),
            Err(HealioError::InsufficientData { required: 2, available: 1 })
        ));
        assert!(matches!(PrincipalProjection::fit(&data, 4), Err(HealioError::InvalidConfig(_))));

        let projection = PrincipalProjection::fit(&data, 2).unwrap();
        assert!(matches!(
            projection.transform(&DVector::<f64>::zeros(5)),
            Err(HealioError::Shape(ShapeError::DimensionMismatch { expected: 3, found: 5 }))
        ));
    }

    #[test]
    fn identical_embeddings_project_to_zero() {
        let data = vec![DVector::from_element(4, 0.5); 6];
        let projection = PrincipalProjection::fit(&data, 2).unwrap();
        let reduced = projection.transform(&data[0]).unwrap();
        assert!(reduced.iter().all(|&v| v == 0.0));
        assert_eq!(projection.explained_variance().ratio, vec![0.0, 0.0]);
    }
}
