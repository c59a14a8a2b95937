//! Calibration and scoring
//!
//! [`calibrate`] fits every statistic from one baseline population, in a
//! fixed order:
//!
//! ```text
//! normalizer -> encoder -> projection -> angle calibration -> centroid
//!            -> quantum threshold -> isolation forest + classical threshold
//!            -> risk regressor
//! ```
//!
//! The result is an immutable [`CalibratedPipeline`]. Scoring borrows it
//! read-only, so one pipeline can serve any number of threads at once.
//! [`SharedPipeline`] is a one-time initialization barrier for services that
//! must start accepting requests before calibration has finished.

use nalgebra::DMatrix;
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::angles::{centroid, AngleCalibration};
use crate::classical::ClassicalScorer;
use crate::encoder::TemporalEncoder;
use crate::fusion::{fuse, PredictionResult};
use crate::normalizer::{FeatureRange, NormalizationStats};
use crate::quantum::QuantumScorer;
use crate::reducer::{ExplainedVariance, PrincipalProjection};
use crate::risk::{RiskRegressor, RiskSupervision, RISK_CATEGORIES};
use crate::threshold::Threshold;
use crate::window::coerce_window;
use crate::{HealioError, HealioResult, PipelineConfig, ShapeError, VitalsWindow};
use healio_ml::ForestStats;

/// Windows assumed free of anomalies, plus optional risk labels
#[derive(Debug, Clone, Default)]
pub struct BaselinePopulation {
    windows: Vec<VitalsWindow>,
    supervision: RiskSupervision,
}

impl BaselinePopulation {
    /// Population with proxy risk targets
    pub fn new(windows: Vec<VitalsWindow>) -> Self {
        Self {
            windows,
            supervision: RiskSupervision::Proxy,
        }
    }

    /// Attach one risk label vector per window
    pub fn with_risk_labels(mut self, labels: Vec<[f64; RISK_CATEGORIES]>) -> Self {
        self.supervision = RiskSupervision::Labeled(labels);
        self
    }

    /// Add a window
    pub fn push(&mut self, window: VitalsWindow) {
        self.windows.push(window);
    }

    /// Baseline windows
    pub fn windows(&self) -> &[VitalsWindow] {
        &self.windows
    }

    /// Risk training targets
    pub fn supervision(&self) -> &RiskSupervision {
        &self.supervision
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// True when there are no windows
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl FromIterator<VitalsWindow> for BaselinePopulation {
    fn from_iter<I: IntoIterator<Item = VitalsWindow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Summary of what calibration fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Number of baseline windows
    pub population_size: usize,
    /// Per-feature normalization ranges
    pub feature_ranges: Vec<FeatureRange>,
    /// Variance retained by the projection
    pub explained_variance: ExplainedVariance,
    /// Per-component angle calibration ranges
    pub angle_ranges: Vec<FeatureRange>,
    /// Calibrated centroid angles
    pub centroid: Vec<f64>,
    /// Quantum distance cutoff
    pub quantum_threshold: Threshold,
    /// Classical score cutoff
    pub classical_threshold: Threshold,
    /// Isolation forest contamination offset
    pub classical_offset: f64,
    /// Isolation forest size
    pub forest: ForestStats,
    /// Whether risk targets were real labels
    pub labeled_risk_targets: bool,
}

/// Everything [`CalibratedPipeline::inspect`] knows about one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Verdict as returned by `score`
    pub prediction: PredictionResult,
    /// Reduced components before angle calibration
    pub reduced: Vec<f64>,
    /// Calibrated rotation angles
    pub angles: Vec<f64>,
    /// Quantum distance exceeded its cutoff
    pub quantum_anomaly: bool,
    /// Classical score exceeded its cutoff
    pub classical_anomaly: bool,
    /// Quantum cutoff in force
    pub quantum_threshold: f64,
    /// Classical cutoff in force
    pub classical_threshold: f64,
}

/// Frozen calibration artifacts; scoring is a pure function of these
#[derive(Debug, Clone)]
pub struct CalibratedPipeline {
    config: PipelineConfig,
    normalizer: NormalizationStats,
    encoder: TemporalEncoder,
    projection: PrincipalProjection,
    angles: AngleCalibration,
    quantum: QuantumScorer,
    classical: ClassicalScorer,
    risk: RiskRegressor,
    report: CalibrationReport,
}

/// Fit every statistic from `population`
pub fn calibrate(population: &BaselinePopulation, config: &PipelineConfig) -> HealioResult<CalibratedPipeline> {
    config.validate()?;
    if population.len() < 2 {
        return Err(HealioError::InsufficientData {
            required: 2,
            available: population.len(),
        });
    }
    for window in population.windows() {
        check_shape(window, config)?;
    }

    let normalizer = NormalizationStats::fit(population.windows())?;
    let normalized = population
        .windows()
        .iter()
        .map(|w| normalizer.transform(w))
        .collect::<HealioResult<Vec<DMatrix<f64>>>>()?;

    let encoder = TemporalEncoder::fit(config, &normalized)?;
    let embeddings = encoder.encode_batch(&normalized)?;

    let projection = PrincipalProjection::fit(&embeddings, config.n_qubits)?;
    let reduced = embeddings
        .iter()
        .map(|e| projection.transform(e))
        .collect::<HealioResult<Vec<_>>>()?;

    let angles = AngleCalibration::fit(&reduced)?;
    let baseline_angles = reduced
        .iter()
        .map(|r| angles.transform(r))
        .collect::<HealioResult<Vec<_>>>()?;
    let centroid = centroid(&baseline_angles)?;

    let quantum = QuantumScorer::fit(&centroid, &baseline_angles, config.quantum_percentile)?;
    let classical = ClassicalScorer::fit(&embeddings, &config.forest, config.classical_percentile)?;
    let risk = RiskRegressor::fit(&embeddings, population.supervision(), &config.risk)?;

    let report = CalibrationReport {
        population_size: population.len(),
        feature_ranges: normalizer.ranges().to_vec(),
        explained_variance: projection.explained_variance().clone(),
        angle_ranges: angles.ranges().to_vec(),
        centroid: quantum.centroid().to_vec(),
        quantum_threshold: quantum.threshold(),
        classical_threshold: classical.threshold(),
        classical_offset: classical.offset(),
        forest: classical.stats(),
        labeled_risk_targets: matches!(population.supervision(), RiskSupervision::Labeled(_)),
    };

    log::info!(
        "calibrated on {} windows: quantum_threshold={:.6} classical_threshold={:.6} explained_variance={:.3}",
        report.population_size,
        report.quantum_threshold.value,
        report.classical_threshold.value,
        report.explained_variance.total_ratio()
    );

    Ok(CalibratedPipeline {
        config: config.clone(),
        normalizer,
        encoder,
        projection,
        angles,
        quantum,
        classical,
        risk,
        report,
    })
}

fn check_shape(window: &VitalsWindow, config: &PipelineConfig) -> HealioResult<()> {
    if window.timesteps() != config.timesteps {
        return Err(ShapeError::TimestepMismatch {
            expected: config.timesteps,
            found: window.timesteps(),
        }
        .into());
    }
    if window.n_features() != config.n_features {
        return Err(ShapeError::FeatureMismatch {
            expected: config.n_features,
            found: window.n_features(),
        }
        .into());
    }
    Ok(())
}

impl CalibratedPipeline {
    /// Score one window
    pub fn score(&self, window: &VitalsWindow) -> HealioResult<PredictionResult> {
        Ok(self.inspect(window)?.prediction)
    }

    /// Coerce raw rows into a window, then score it
    pub fn score_rows<R: AsRef<[f64]>>(&self, rows: &[R]) -> HealioResult<PredictionResult> {
        let window = coerce_window(rows, &self.config)?;
        self.score(&window)
    }

    /// Score several windows; identical to scoring each alone
    pub fn score_batch(&self, windows: &[VitalsWindow]) -> HealioResult<Vec<PredictionResult>> {
        windows.iter().map(|w| self.score(w)).collect()
    }

    /// Score one window and keep every intermediate decision
    pub fn inspect(&self, window: &VitalsWindow) -> HealioResult<ScoreBreakdown> {
        check_shape(window, &self.config)?;

        let normalized = self.normalizer.transform(window)?;
        let embedding = self.encoder.encode(&normalized)?;

        let reduced = self.projection.transform(&embedding)?;
        let angles = self.angles.transform(&reduced)?;
        let quantum_score = self.quantum.score(&angles)?;
        let classical_score = self.classical.score(&embedding)?;
        let risks = self.risk.predict(&embedding)?;

        let quantum_anomaly = self.quantum.is_anomaly(quantum_score);
        let classical_anomaly = self.classical.is_anomaly(classical_score);
        let alert = fuse(quantum_anomaly, classical_anomaly);

        log::debug!(
            "scored window: quantum={quantum_score:.6} ({quantum_anomaly}) classical={classical_score:.6} ({classical_anomaly}) alert={alert}"
        );

        Ok(ScoreBreakdown {
            prediction: PredictionResult {
                alert,
                quantum_score,
                classical_score,
                risks,
            },
            reduced: reduced.iter().copied().collect(),
            angles: angles.iter().copied().collect(),
            quantum_anomaly,
            classical_anomaly,
            quantum_threshold: self.quantum.threshold().value,
            classical_threshold: self.classical.threshold().value,
        })
    }

    /// What calibration fit
    pub fn calibration_report(&self) -> &CalibrationReport {
        &self.report
    }

    /// Configuration the pipeline was calibrated with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// One-time initialization barrier around a [`CalibratedPipeline`]
#[derive(Debug, Default)]
pub struct SharedPipeline {
    cell: OnceCell<CalibratedPipeline>,
}

impl SharedPipeline {
    /// Empty barrier
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Install a calibrated pipeline; hands it back if one is already installed
    pub fn install(&self, pipeline: CalibratedPipeline) -> Result<(), CalibratedPipeline> {
        self.cell.set(pipeline)
    }

    /// Installed pipeline, or calibrate one with `init` and install it
    ///
    /// Concurrent callers block until the one running `init` finishes; `init`
    /// runs at most once per successful installation. A failed `init` leaves
    /// the barrier empty.
    pub fn get_or_calibrate<F>(&self, init: F) -> HealioResult<&CalibratedPipeline>
    where
        F: FnOnce() -> HealioResult<CalibratedPipeline>,
    {
        self.cell.get_or_try_init(init)
    }

    /// Installed pipeline
    pub fn get(&self) -> HealioResult<&CalibratedPipeline> {
        self.cell
            .get()
            .ok_or(HealioError::NotFitted("no calibrated pipeline installed"))
    }

    /// True once a pipeline is installed
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Score through the installed pipeline
    pub fn score(&self, window: &VitalsWindow) -> HealioResult<PredictionResult> {
        self.get()?.score(window)
    }
}
