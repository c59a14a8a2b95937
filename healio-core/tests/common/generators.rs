//! Synthetic vital-sign generators
//!
//! Values are drawn independently per timestep from fixed normal
//! parameters using the crate's seeded generator, so populations are
//! reproducible across platforms.

use healio_core::{BaselinePopulation, PipelineConfig, VitalsWindow};
use healio_ml::Rng;

/// Resting adult means: heart rate, systolic, diastolic, SpO2, sleep state
pub const BASELINE_MEAN: [f64; 5] = [72.0, 120.0, 80.0, 98.0, 1.0];

/// Per-feature standard deviations
pub const BASELINE_STD: [f64; 5] = [3.0, 5.0, 4.0, 0.5, 0.3];

/// Index of the ordinal sleep-state feature
const SLEEP_STATE: usize = 4;

/// Normal-parameter window generator
pub struct VitalsGenerator {
    rng: Rng,
}

impl VitalsGenerator {
    /// Seeded generator
    pub fn new(seed: u64) -> Self {
        Self { rng: Rng::new(seed) }
    }

    /// One timestep; sleep state is rounded and kept within 0..=3
    pub fn sample(&mut self) -> Vec<f64> {
        (0..BASELINE_MEAN.len())
            .map(|f| {
                let value = BASELINE_MEAN[f] + BASELINE_STD[f] * self.rng.next_gaussian();
                if f == SLEEP_STATE {
                    value.round().clamp(0.0, 3.0)
                } else {
                    value
                }
            })
            .collect()
    }

    /// One window of `config.timesteps` samples
    pub fn window(&mut self, config: &PipelineConfig) -> VitalsWindow {
        let rows: Vec<Vec<f64>> = (0..config.timesteps).map(|_| self.sample()).collect();
        VitalsWindow::from_rows(&rows, config).expect("generated window has configured shape")
    }

    /// `n` windows with proxy risk targets
    pub fn population(&mut self, n: usize, config: &PipelineConfig) -> BaselinePopulation {
        (0..n).map(|_| self.window(config)).collect()
    }
}
