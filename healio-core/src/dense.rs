//! Fully connected layers shared by the encoder and the risk regressor

use healio_ml::Rng;
use nalgebra::{DMatrix, DVector};

/// Element-wise non-linearity applied after the affine map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// max(0, z)
    Relu,
    /// 1 / (1 + e^-z)
    Sigmoid,
}

impl Activation {
    /// Apply to one pre-activation
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => sigmoid(z),
        }
    }

    /// Derivative expressed through the activation's output `a`
    pub fn derivative_from_output(self, a: f64) -> f64 {
        match self {
            Activation::Relu => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
        }
    }
}

/// Logistic function, evaluated without overflowing `exp`
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `activation(W x + b)` with `W` stored as `(outputs, inputs)`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// Weight matrix, one row per output unit
    pub weights: DMatrix<f64>,
    /// Bias vector
    pub bias: DVector<f64>,
    /// Output non-linearity
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights and zero bias
    ///
    /// Weights are drawn row by row from `U(-l, l)` with
    /// `l = sqrt(6 / (inputs + outputs))`.
    pub fn glorot_uniform(inputs: usize, outputs: usize, activation: Activation, rng: &mut Rng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let draws: Vec<f64> = (0..inputs * outputs)
            .map(|_| rng.next_f64_range(-limit, limit))
            .collect();

        Self {
            weights: DMatrix::from_row_slice(outputs, inputs, &draws),
            bias: DVector::<f64>::zeros(outputs),
            activation,
        }
    }

    /// Input width
    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Output width
    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    /// `W X + b` for a batch stored one sample per column
    pub fn pre_activation(&self, inputs: &DMatrix<f64>) -> DMatrix<f64> {
        let mut z = &self.weights * inputs;
        for mut column in z.column_iter_mut() {
            column += &self.bias;
        }
        z
    }

    /// Forward pass for a batch stored one sample per column
    pub fn forward_batch(&self, inputs: &DMatrix<f64>) -> DMatrix<f64> {
        let activation = self.activation;
        self.pre_activation(inputs).map(|z| activation.apply(z))
    }

    /// Forward pass for a single sample
    pub fn forward(&self, input: &DVector<f64>) -> DVector<f64> {
        let activation = self.activation;
        (&self.weights * input + &self.bias).map(|z| activation.apply(z))
    }
}
