//! Risk regressor
//!
//! A small feed-forward network mapping a window embedding to four
//! independent disease-risk probabilities (sigmoid outputs, not a
//! distribution). It is trained once during calibration with Adam on mean
//! squared error, against caller-supplied labels or, lacking those, seeded
//! uniform proxy targets.

use healio_ml::Rng;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RiskTrainingConfig;
use crate::dense::{Activation, DenseLayer};
use crate::{HealioError, HealioResult, ShapeError};

/// Number of scored disease categories
pub const RISK_CATEGORIES: usize = 4;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

/// Disease category, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Cardiovascular
    Cardio,
    /// Respiratory
    Respiratory,
    /// Metabolic
    Metabolic,
    /// Neurological
    Neurological,
}

impl RiskCategory {
    /// All categories in output order
    pub const ALL: [RiskCategory; RISK_CATEGORIES] = [
        RiskCategory::Cardio,
        RiskCategory::Respiratory,
        RiskCategory::Metabolic,
        RiskCategory::Neurological,
    ];

    /// Serialization key
    pub fn key(self) -> &'static str {
        match self {
            RiskCategory::Cardio => "cardio",
            RiskCategory::Respiratory => "respiratory",
            RiskCategory::Metabolic => "metabolic",
            RiskCategory::Neurological => "neurological",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            RiskCategory::Cardio => "Cardiovascular",
            RiskCategory::Respiratory => "Respiratory",
            RiskCategory::Metabolic => "Metabolic",
            RiskCategory::Neurological => "Neurological",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Per-category risk probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Cardiovascular risk
    pub cardio: f64,
    /// Respiratory risk
    pub respiratory: f64,
    /// Metabolic risk
    pub metabolic: f64,
    /// Neurological risk
    pub neurological: f64,
}

impl RiskProfile {
    /// Build from values in category order
    pub fn from_array(values: [f64; RISK_CATEGORIES]) -> Self {
        let [cardio, respiratory, metabolic, neurological] = values;
        Self {
            cardio,
            respiratory,
            metabolic,
            neurological,
        }
    }

    /// Values in category order
    pub fn to_array(&self) -> [f64; RISK_CATEGORIES] {
        [self.cardio, self.respiratory, self.metabolic, self.neurological]
    }

    /// Probability for one category
    pub fn get(&self, category: RiskCategory) -> f64 {
        match category {
            RiskCategory::Cardio => self.cardio,
            RiskCategory::Respiratory => self.respiratory,
            RiskCategory::Metabolic => self.metabolic,
            RiskCategory::Neurological => self.neurological,
        }
    }

    /// `(category, probability)` pairs in category order
    pub fn iter(&self) -> impl Iterator<Item = (RiskCategory, f64)> + '_ {
        RiskCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Training targets for the risk regressor
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RiskSupervision {
    /// One target vector per baseline window, each value in [0, 1]
    Labeled(Vec<[f64; RISK_CATEGORIES]>),
    /// Seeded uniform placeholder targets with no clinical meaning
    #[default]
    Proxy,
}

impl RiskSupervision {
    fn resolve(&self, n: usize, rng: &mut Rng) -> HealioResult<Vec<[f64; RISK_CATEGORIES]>> {
        match self {
            RiskSupervision::Labeled(targets) => {
                if targets.len() != n {
                    return Err(HealioError::RiskLabelCount {
                        windows: n,
                        labels: targets.len(),
                    });
                }
                for (row, target) in targets.iter().enumerate() {
                    if let Some(&value) = target.iter().find(|v| !(0.0..=1.0).contains(*v)) {
                        return Err(HealioError::InvalidRiskTarget { row, value });
                    }
                }
                Ok(targets.clone())
            }
            RiskSupervision::Proxy => {
                log::warn!("training risk regressor on proxy targets; risk outputs carry no clinical signal");
                Ok((0..n)
                    .map(|_| std::array::from_fn(|_| rng.next_f64()))
                    .collect())
            }
        }
    }
}

/// First and second moment estimates for one layer
#[derive(Debug, Clone)]
struct AdamState {
    m_w: DMatrix<f64>,
    v_w: DMatrix<f64>,
    m_b: DVector<f64>,
    v_b: DVector<f64>,
}

impl AdamState {
    fn for_layer(layer: &DenseLayer) -> Self {
        let (rows, cols) = layer.weights.shape();
        Self {
            m_w: DMatrix::<f64>::zeros(rows, cols),
            v_w: DMatrix::<f64>::zeros(rows, cols),
            m_b: DVector::<f64>::zeros(rows),
            v_b: DVector::<f64>::zeros(rows),
        }
    }
}

/// Feed-forward sigmoid-output regressor
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRegressor {
    layers: Vec<DenseLayer>,
}

impl RiskRegressor {
    /// Train on baseline embeddings
    pub fn fit(
        embeddings: &[DVector<f64>],
        supervision: &RiskSupervision,
        config: &RiskTrainingConfig,
    ) -> HealioResult<Self> {
        let input_dim = embeddings.first().map(|e| e.len()).ok_or(HealioError::InsufficientData {
            required: 1,
            available: 0,
        })?;
        if config.batch_size == 0 {
            return Err(HealioError::InvalidConfig("risk batch_size must be positive"));
        }

        let mut rng = Rng::new(config.seed);

        let mut widths = vec![input_dim];
        widths.extend(&config.hidden_dims);
        widths.push(RISK_CATEGORIES);
        let last = widths.len() - 2;
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let activation = if i == last { Activation::Sigmoid } else { Activation::Relu };
                DenseLayer::glorot_uniform(w[0], w[1], activation, &mut rng)
            })
            .collect();

        let targets = supervision.resolve(embeddings.len(), &mut rng)?;
        let mut regressor = Self { layers };
        regressor.train(embeddings, &targets, config, &mut rng)?;
        Ok(regressor)
    }

    fn train(
        &mut self,
        embeddings: &[DVector<f64>],
        targets: &[[f64; RISK_CATEGORIES]],
        config: &RiskTrainingConfig,
        rng: &mut Rng,
    ) -> HealioResult<()> {
        let input_dim = self.input_dim();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != input_dim) {
            return Err(ShapeError::DimensionMismatch {
                expected: input_dim,
                found: bad.len(),
            }
            .into());
        }

        let mut state: Vec<AdamState> = self.layers.iter().map(AdamState::for_layer).collect();
        let mut step = 0i32;
        let mut order: Vec<usize> = (0..embeddings.len()).collect();

        for epoch in 0..config.epochs {
            for i in (1..order.len()).rev() {
                order.swap(i, rng.next_range(i + 1));
            }

            let mut epoch_loss = 0.0;
            for batch in order.chunks(config.batch_size) {
                let inputs = DMatrix::from_fn(input_dim, batch.len(), |r, c| embeddings[batch[c]][r]);
                let expected = DMatrix::from_fn(RISK_CATEGORIES, batch.len(), |r, c| targets[batch[c]][r]);

                step += 1;
                epoch_loss += self.train_batch(&inputs, &expected, &mut state, step, config.learning_rate)
                    * batch.len() as f64;
            }

            log::debug!(
                "risk regressor epoch {}/{}: mse={:.6}",
                epoch + 1,
                config.epochs,
                epoch_loss / embeddings.len() as f64
            );
        }

        Ok(())
    }

    /// One Adam step on a column-major batch, returning the batch loss
    fn train_batch(
        &mut self,
        inputs: &DMatrix<f64>,
        expected: &DMatrix<f64>,
        state: &mut [AdamState],
        step: i32,
        learning_rate: f64,
    ) -> f64 {
        let mut activations = vec![inputs.clone()];
        for layer in &self.layers {
            let next = layer.forward_batch(&activations[activations.len() - 1]);
            activations.push(next);
        }

        let output = &activations[activations.len() - 1];
        let error = output - expected;
        let scale = 2.0 / error.len() as f64;
        let loss = error.norm_squared() / error.len() as f64;

        let mut delta = error * scale;
        let bias1 = 1.0 - ADAM_BETA1.powi(step);
        let bias2 = 1.0 - ADAM_BETA2.powi(step);

        for index in (0..self.layers.len()).rev() {
            let layer = &mut self.layers[index];
            let activation = layer.activation;
            delta.zip_apply(&activations[index + 1], |d, a| *d *= activation.derivative_from_output(a));

            let grad_w = &delta * activations[index].transpose();
            let grad_b = delta.column_sum();
            let propagated = layer.weights.transpose() * &delta;

            let s = &mut state[index];
            adam_update(&mut layer.weights, &grad_w, &mut s.m_w, &mut s.v_w, bias1, bias2, learning_rate);
            adam_update(&mut layer.bias, &grad_b, &mut s.m_b, &mut s.v_b, bias1, bias2, learning_rate);

            delta = propagated;
        }

        loss
    }

    /// Embedding width the regressor accepts
    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    /// Forward pass for one embedding
    pub fn predict(&self, embedding: &DVector<f64>) -> HealioResult<RiskProfile> {
        if embedding.len() != self.input_dim() {
            return Err(ShapeError::DimensionMismatch {
                expected: self.input_dim(),
                found: embedding.len(),
            }
            .into());
        }

        let output = self
            .layers
            .iter()
            .fold(embedding.clone(), |x, layer| layer.forward(&x));

        Ok(RiskProfile::from_array(std::array::from_fn(|i| output[i])))
    }
}

fn adam_update<R, C, S>(
    param: &mut nalgebra::Matrix<f64, R, C, S>,
    grad: &nalgebra::Matrix<f64, R, C, S>,
    m: &mut nalgebra::Matrix<f64, R, C, S>,
    v: &mut nalgebra::Matrix<f64, R, C, S>,
    bias1: f64,
    bias2: f64,
    learning_rate: f64,
) where
    R: nalgebra::Dim,
    C: nalgebra::Dim,
    S: nalgebra::StorageMut<f64, R, C>,
{
    for (((p, &g), m), v) in param.iter_mut().zip(grad.iter()).zip(m.iter_mut()).zip(v.iter_mut()) {
        *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
        *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
        let m_hat = *m / bias1;
        let v_hat = *v / bias2;
        *p -= learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embeddings(n: usize, dim: usize) -> Vec<DVector<f64>> {
        let mut rng = Rng::new(17);
        (0..n).map(|_| DVector::from_fn(dim, |_, _| rng.next_f64())).collect()
    }

    fn config() -> RiskTrainingConfig {
        RiskTrainingConfig {
            hidden_dims: vec![8, 4],
            epochs: 3,
            batch_size: 8,
            ..RiskTrainingConfig::default()
        }
    }

    #[test]
    fn outputs_are_probabilities() {
        let data = embeddings(40, 6);
        let regressor = RiskRegressor::fit(&data, &RiskSupervision::Proxy, &config()).unwrap();

        for probe in [
            data[0].clone(),
            DVector::<f64>::zeros(6),
            DVector::from_element(6, 1e6),
            DVector::from_element(6, -1e6),
        ] {
            let risks = regressor.predict(&probe).unwrap();
            assert!(risks.iter().all(|(_, p)| (0.0..=1.0).contains(&p)), "{risks:?}");
        }
    }

    #[test]
    fn training_moves_towards_labels() {
        let data = embeddings(64, 4);
        let labels = vec![[0.9, 0.1, 0.9, 0.1]; 64];
        let untrained = RiskRegressor::fit(
            &data,
            &RiskSupervision::Labeled(labels.clone()),
            &RiskTrainingConfig { epochs: 0, ..config() },
        )
        .unwrap();
        let trained = RiskRegressor::fit(
            &data,
            &RiskSupervision::Labeled(labels),
            &RiskTrainingConfig {
                epochs: 200,
                learning_rate: 0.01,
                ..config()
            },
        )
        .unwrap();

        let error = |r: &RiskRegressor| {
            let p = r.predict(&data[0]).unwrap().to_array();
            (p[0] - 0.9).abs() + (p[1] - 0.1).abs() + (p[2] - 0.9).abs() + (p[3] - 0.1).abs()
        };
        assert!(error(&trained) < error(&untrained));
        assert!(error(&trained) < 0.4);
    }

    #[test]
    fn seeded_training_is_reproducible() {
        let data = embeddings(30, 5);
        let a = RiskRegressor::fit(&data, &RiskSupervision::Proxy, &config()).unwrap();
        let b = RiskRegressor::fit(&data, &RiskSupervision::Proxy, &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn labels_are_validated() {
        let data = embeddings(3, 2);
        let bad = RiskSupervision::Labeled(vec![[0.1; 4], [0.2, 1.5, 0.0, 0.0], [0.0; 4]]);
        assert!(matches!(
            RiskRegressor::fit(&data, &bad, &config()),
            Err(HealioError::InvalidRiskTarget { row: 1, value }) if value == 1.5
        ));

        let nan = RiskSupervision::Labeled(vec![[0.1; 4], [0.1; 4], [f64::NAN, 0.0, 0.0, 0.0]]);
        assert!(matches!(
            RiskRegressor::fit(&data, &nan, &config()),
            Err(HealioError::InvalidRiskTarget { row: 2, .. })
        ));

        let short = RiskSupervision::Labeled(vec![[0.1; 4]]);
        assert!(matches!(
            RiskRegressor::fit(&data, &short, &config()),
            Err(HealioError::RiskLabelCount { windows: 3, labels: 1 })
        ));

        let long = RiskSupervision::Labeled(vec![[0.1; 4]; 5]);
        assert!(matches!(
            RiskRegressor::fit(&data, &long, &config()),
            Err(HealioError::RiskLabelCount { windows: 3, labels: 5 })
        ));
    }

    #[test]
    fn category_names() {
        assert_eq!(RiskCategory::Cardio.display_name(), "Cardiovascular");
        assert_eq!(RiskCategory::Neurological.to_string(), "Neurological");
        assert_eq!(serde_json::to_string(&RiskCategory::Metabolic).unwrap(), "\"metabolic\"");

        let profile = RiskProfile::from_array([0.1, 0.2, 0.3, 0.4]);
        assert_eq!(profile.get(RiskCategory::Metabolic), 0.3);
        let json = serde_json::to_value(profile).unwrap();
        assert_eq!(json["respiratory"], 0.2);
    }
}
