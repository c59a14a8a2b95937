//! Error Types for the Risk-Scoring Pipeline
//!
//! ## Error Categories
//!
//! ### Per-call failures
//! - `Shape`: the input matrix is empty, ragged, of the wrong width or holds a
//!   NaN/infinite reading. Fatal to that call only; the frozen calibration
//!   state is never touched.
//!
//! ### Lifecycle failures
//! - `NotFitted`: scoring attempted before calibration completed. Callers that
//!   go through [`crate::SharedPipeline`] see this until a pipeline is installed.
//!
//! ### Calibration failures
//! - `InsufficientData`, `InvalidConfig`, `RiskLabelCount`,
//!   `InvalidRiskTarget`, `Forest`:
//!   raised while fitting; calibration is all-or-nothing, so any of these is
//!   fatal to pipeline startup.
//!
//! ### Configuration loading
//! - `ConfigIo`, `Json`
//!
//! Numeric degeneracy (constant baseline features, constant reduced
//! components) is never an error: those cases map to 0.0 and are logged.
//!
//! ```rust
//! use healio_core::{HealioError, ShapeError, coerce_window, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let rows: Vec<Vec<f64>> = Vec::new();
//! match coerce_window(&rows, &config) {
//!     Err(HealioError::Shape(ShapeError::Empty)) => { /* reject the upload */ }
//!     _ => unreachable!(),
//! }
//! ```

use healio_ml::MLError;
use thiserror::Error;

/// Result type for pipeline operations
pub type HealioResult<T> = Result<T, HealioError>;

/// Input that cannot be coerced into a scoring window
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    /// No rows at all
    #[error("Input matrix has no rows")]
    Empty,

    /// Rows present but zero columns wide
    #[error("Input matrix has zero columns")]
    NoColumns,

    /// A row whose width differs from the first row
    #[error("Row {row} has {found} columns, expected {expected}")]
    Ragged {
        /// Offending row index
        row: usize,
        /// Width of the first row
        expected: usize,
        /// Width of the offending row
        found: usize,
    },

    /// Per-timestep feature count does not match `n_features`
    #[error("Expected {expected} features, found {found}")]
    FeatureMismatch {
        /// Configured feature count
        expected: usize,
        /// Feature count presented
        found: usize,
    },

    /// Window length does not match `timesteps`
    #[error("Expected {expected} timesteps, found {found}")]
    TimestepMismatch {
        /// Configured window length
        expected: usize,
        /// Window length presented
        found: usize,
    },

    /// Vector length does not match a fitted transform
    #[error("Expected vector of length {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension the transform was fit on
        expected: usize,
        /// Dimension presented
        found: usize,
    },

    /// NaN or infinite reading
    #[error("Non-finite value at timestep {timestep}, feature {feature}")]
    NonFinite {
        /// Row of the reading
        timestep: usize,
        /// Column of the reading
        feature: usize,
    },
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum HealioError {
    /// Input shape problem
    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Scoring requested before calibration completed
    #[error("Pipeline not calibrated: {0}")]
    NotFitted(&'static str),

    /// Baseline population too small to fit
    #[error("Insufficient baseline data: need {required}, have {available}")]
    InsufficientData {
        /// Minimum number of windows needed
        required: usize,
        /// Number of windows supplied
        available: usize,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Number of risk label rows differs from the number of baseline windows
    #[error("Expected {windows} risk label rows, found {labels}")]
    RiskLabelCount {
        /// Baseline windows
        windows: usize,
        /// Label rows supplied
        labels: usize,
    },

    /// Supervised risk target outside [0, 1] or not finite
    #[error("Invalid risk target at row {row}: {value}")]
    InvalidRiskTarget {
        /// Baseline window index
        row: usize,
        /// Offending value
        value: f64,
    },

    /// Outlier ensemble failed to fit
    #[error("Isolation forest error: {0}")]
    Forest(#[from] MLError),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// JSON configuration could not be parsed or a result could not be rendered
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
