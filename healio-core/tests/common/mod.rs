//! Common test utilities for integration tests
//!
//! - Synthetic baseline populations drawn from fixed normal parameters
//! - Fixture windows (baseline mean, extreme vitals)
//! - One calibrated pipeline shared by every test in a binary

#![allow(dead_code)]

use std::sync::OnceLock;

use healio_core::{calibrate, BaselinePopulation, CalibratedPipeline, PipelineConfig, VitalsWindow};

pub mod generators;

use generators::VitalsGenerator;

/// Baseline population size used by the shared pipeline
pub const POPULATION_SIZE: usize = 300;

/// Seed of the shared baseline population
pub const POPULATION_SEED: u64 = 7;

/// Shared population and the pipeline calibrated on it
pub struct Fixture {
    /// Baseline the pipeline was calibrated on
    pub population: BaselinePopulation,
    /// Calibrated pipeline
    pub pipeline: CalibratedPipeline,
}

/// Default-configured pipeline calibrated once per test binary
pub fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let config = PipelineConfig::default();
        let population = VitalsGenerator::new(POPULATION_SEED).population(POPULATION_SIZE, &config);
        let pipeline = calibrate(&population, &config).expect("baseline calibration");
        Fixture { population, pipeline }
    })
}

/// Window whose every timestep is the per-feature mean of the population
pub fn mean_window(population: &BaselinePopulation, config: &PipelineConfig) -> VitalsWindow {
    let mut sums = vec![0.0; config.n_features];
    let mut count = 0usize;
    for window in population.windows() {
        for t in 0..window.timesteps() {
            for (sum, value) in sums.iter_mut().zip(window.row(t)) {
                *sum += value;
            }
            count += 1;
        }
    }
    let mean: Vec<f64> = sums.iter().map(|s| s / count as f64).collect();
    VitalsWindow::constant(&mean, config).expect("mean window")
}

/// Tachycardic, hypoxic window: heart rate 220, SpO2 70 at every timestep
pub fn extreme_window(config: &PipelineConfig) -> VitalsWindow {
    VitalsWindow::constant(&[220.0, 120.0, 80.0, 70.0, 1.0], config).expect("extreme window")
}
