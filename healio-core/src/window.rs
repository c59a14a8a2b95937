//! Vital-sign windows and input shape coercion
//!
//! A [`VitalsWindow`] is the fixed `(timesteps, n_features)` matrix every
//! scoring call consumes. Ingestion hands over whatever it has, `coerce_window`
//! bends it into shape:
//!
//! ```text
//! rows < timesteps     append copies of the last row
//! rows > timesteps     keep the most recent `timesteps` rows
//! cols < n_features    pad trailing columns with 0.0
//! cols > n_features    keep the first `n_features` columns
//! ```

use nalgebra::DMatrix;

use crate::{HealioError, HealioResult, PipelineConfig, ShapeError};

/// Column order of a vitals window
pub const FEATURE_NAMES: [&str; 5] = [
    "heart_rate",
    "systolic_bp",
    "diastolic_bp",
    "oxygen_saturation",
    "sleep_state",
];

/// Fixed-shape window of per-timestep vital-sign vectors
///
/// Rows are timesteps (oldest first), columns are features. Every reading is
/// finite.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsWindow {
    data: DMatrix<f64>,
}

impl VitalsWindow {
    /// Wrap a matrix that already has the configured shape
    pub fn new(data: DMatrix<f64>, config: &PipelineConfig) -> HealioResult<Self> {
        if data.nrows() != config.timesteps {
            return Err(ShapeError::TimestepMismatch {
                expected: config.timesteps,
                found: data.nrows(),
            }
            .into());
        }
        if data.ncols() != config.n_features {
            return Err(ShapeError::FeatureMismatch {
                expected: config.n_features,
                found: data.ncols(),
            }
            .into());
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            // column-major storage
            return Err(ShapeError::NonFinite {
                timestep: index % data.nrows(),
                feature: index / data.nrows(),
            }
            .into());
        }
        Ok(Self { data })
    }

    /// Build from row vectors of exactly the configured shape
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], config: &PipelineConfig) -> HealioResult<Self> {
        let width = check_rows(rows)?;
        let data = DMatrix::from_fn(rows.len(), width, |i, j| rows[i].as_ref()[j]);
        Self::new(data, config)
    }

    /// Same vector repeated at every timestep
    pub fn constant(row: &[f64], config: &PipelineConfig) -> HealioResult<Self> {
        let data = DMatrix::from_fn(config.timesteps, row.len(), |_, j| row[j]);
        Self::new(data, config)
    }

    /// Number of timesteps
    pub fn timesteps(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features per timestep
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Underlying matrix
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Copy of one timestep
    pub fn row(&self, t: usize) -> Vec<f64> {
        self.data.row(t).iter().copied().collect()
    }
}

/// Validate a row set, returning its width
fn check_rows<R: AsRef<[f64]>>(rows: &[R]) -> HealioResult<usize> {
    let first = rows.first().ok_or(ShapeError::Empty)?;
    let width = first.as_ref().len();
    if width == 0 {
        return Err(ShapeError::NoColumns.into());
    }

    if let Some((row, found)) = rows
        .iter()
        .map(|r| r.as_ref().len())
        .enumerate()
        .find(|&(_, len)| len != width)
    {
        return Err(ShapeError::Ragged { row, expected: width, found }.into());
    }

    Ok(width)
}

/// Coerce an arbitrary `(rows, cols)` matrix into a scoring window
pub fn coerce_window<R: AsRef<[f64]>>(rows: &[R], config: &PipelineConfig) -> HealioResult<VitalsWindow> {
    if config.timesteps == 0 || config.n_features == 0 {
        return Err(HealioError::InvalidConfig("window shape must be non-empty"));
    }
    let width = check_rows(rows)?;
    let timesteps = config.timesteps;
    let n_features = config.n_features;

    // Most recent `timesteps` rows, then pad by repeating the last one
    let start = rows.len().saturating_sub(timesteps);
    let kept = &rows[start..];
    let last = kept.len() - 1;

    let data = DMatrix::from_fn(timesteps, n_features, |i, j| {
        let source = kept[i.min(last)].as_ref();
        if j < width {
            source[j]
        } else {
            0.0
        }
    });

    if rows.len() != timesteps || width != n_features {
        log::debug!(
            "coerced input {}x{} to {}x{}",
            rows.len(),
            width,
            timesteps,
            n_features
        );
    }

    VitalsWindow::new(data, config)
}
