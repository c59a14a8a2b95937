//! Health-risk scoring core for Heal.io
//!
//! Turns a rolling window of patient vital signs into a calibrated verdict.
//! Every statistic is fit once from a baseline population by [`calibrate`];
//! the resulting [`CalibratedPipeline`] is immutable and scores windows as a
//! pure function of its frozen state.
//!
//! Per window:
//! ```text
//! coerce -> normalize -> encode -+-> project -> angles -> quantum distance -+
//!                                +-> isolation forest ----------------------+-> fuse
//!                                +-> risk regressor ------------------------+
//! ```
//!
//! ```no_run
//! use healio_core::{calibrate, BaselinePopulation, PipelineConfig, VitalsWindow};
//!
//! let config = PipelineConfig::default();
//! # let baseline_windows: Vec<VitalsWindow> = Vec::new();
//! let population = BaselinePopulation::new(baseline_windows);
//! let pipeline = calibrate(&population, &config)?;
//!
//! let rows = vec![vec![72.0, 120.0, 80.0, 98.0, 1.0]; 60];
//! let result = pipeline.score_rows(&rows)?;
//! println!("{}", result.to_json()?);
//! # Ok::<(), healio_core::HealioError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod angles;
pub mod classical;
pub mod config;
mod dense;
pub mod encoder;
pub mod errors;
pub mod fusion;
pub mod normalizer;
pub mod pipeline;
pub mod quantum;
pub mod reducer;
pub mod risk;
pub mod threshold;
pub mod window;

// Public API
pub use config::{PipelineConfig, RiskTrainingConfig};
pub use errors::{HealioError, HealioResult, ShapeError};
pub use fusion::{fuse, AlertLevel, PredictionResult, RiskFinding, Severity};
pub use pipeline::{
    calibrate, BaselinePopulation, CalibratedPipeline, CalibrationReport, ScoreBreakdown, SharedPipeline,
};
pub use quantum::{overlap, quantum_distance};
pub use risk::{RiskCategory, RiskProfile, RiskSupervision};
pub use threshold::Threshold;
pub use window::{coerce_window, VitalsWindow, FEATURE_NAMES};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
