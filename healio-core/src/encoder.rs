//! Temporal encoder
//!
//! Two feature-wise dense layers (`hidden_dim` then `embedding_dim`, ReLU)
//! applied to every timestep independently, followed by a mean over the time
//! axis. Pooling over time rather than taking the last step keeps the
//! embedding insensitive to where an event falls inside the window.
//!
//! Weights are fixed seeded Glorot-uniform draws. Biases are anchored on the
//! baseline population: for every unit, the smallest pre-activation seen over
//! all baseline timesteps is lifted to `activation_margin`. Every unit is then
//! active across the baseline, so the encoder is affine there and a window
//! equal to the baseline mean embeds exactly to the mean baseline embedding.

use healio_ml::Rng;
use nalgebra::{DMatrix, DVector};

use crate::dense::{Activation, DenseLayer};
use crate::{HealioError, HealioResult, PipelineConfig, ShapeError};

/// Fixed-weight time-pooled encoder
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalEncoder {
    hidden: DenseLayer,
    output: DenseLayer,
}

impl TemporalEncoder {
    /// Draw weights from `encoder_seed` and anchor biases on the baseline
    ///
    /// `baseline` holds normalized windows, one `(timesteps, n_features)`
    /// matrix each.
    pub fn fit(config: &PipelineConfig, baseline: &[DMatrix<f64>]) -> HealioResult<Self> {
        if baseline.is_empty() {
            return Err(HealioError::InsufficientData {
                required: 1,
                available: 0,
            });
        }

        let mut rng = Rng::new(config.encoder_seed);
        let mut hidden = DenseLayer::glorot_uniform(config.n_features, config.hidden_dim, Activation::Relu, &mut rng);
        let mut output = DenseLayer::glorot_uniform(config.hidden_dim, config.embedding_dim, Activation::Relu, &mut rng);

        let steps = stack_timesteps(config.n_features, baseline)?;

        hidden.bias = anchor_bias(&hidden.pre_activation(&steps), config.activation_margin);
        let activations = hidden.forward_batch(&steps);
        output.bias = anchor_bias(&output.pre_activation(&activations), config.activation_margin);

        log::debug!(
            "encoder anchored on {} timesteps ({} -> {} -> {})",
            steps.ncols(),
            config.n_features,
            config.hidden_dim,
            config.embedding_dim
        );

        Ok(Self { hidden, output })
    }

    /// Input feature width
    pub fn n_features(&self) -> usize {
        self.hidden.inputs()
    }

    /// Output embedding width
    pub fn embedding_dim(&self) -> usize {
        self.output.outputs()
    }

    /// Embed one normalized window
    pub fn encode(&self, window: &DMatrix<f64>) -> HealioResult<DVector<f64>> {
        if window.ncols() != self.n_features() {
            return Err(ShapeError::FeatureMismatch {
                expected: self.n_features(),
                found: window.ncols(),
            }
            .into());
        }
        if window.nrows() == 0 {
            return Err(ShapeError::Empty.into());
        }

        let steps = window.transpose();
        let per_step = self.output.forward_batch(&self.hidden.forward_batch(&steps));
        Ok(per_step.column_mean())
    }

    /// Embed several normalized windows
    pub fn encode_batch(&self, windows: &[DMatrix<f64>]) -> HealioResult<Vec<DVector<f64>>> {
        windows.iter().map(|w| self.encode(w)).collect()
    }
}

/// All timesteps of all windows as columns of one `(n_features, N)` matrix
fn stack_timesteps(n_features: usize, windows: &[DMatrix<f64>]) -> HealioResult<DMatrix<f64>> {
    if let Some(bad) = windows.iter().find(|w| w.ncols() != n_features) {
        return Err(ShapeError::FeatureMismatch {
            expected: n_features,
            found: bad.ncols(),
        }
        .into());
    }

    let total: usize = windows.iter().map(|w| w.nrows()).sum();
    let mut steps = DMatrix::<f64>::zeros(n_features, total);
    let mut column = 0;
    for window in windows {
        for row in window.row_iter() {
            steps.set_column(column, &row.transpose());
            column += 1;
        }
    }
    Ok(steps)
}

/// Bias lifting each row's minimum to `margin`
fn anchor_bias(pre_activation: &DMatrix<f64>, margin: f64) -> DVector<f64> {
    DVector::from_iterator(
        pre_activation.nrows(),
        pre_activation.row_iter().map(|row| margin - row.min()),
    )
}
