//! Heal.io Window Scoring Example
//!
//! Calibrates the pipeline on a synthetic population of resting adults, then
//! scores three windows:
//! - a resting window drawn from the same distribution
//! - a tachycardic, hypoxic episode (HR 220, SpO2 70)
//! - a short, partial upload (20 rows, 3 columns) that is coerced first
//!
//! Run with `RUST_LOG=debug` to see per-window scores.

use healio_core::{calibrate, BaselinePopulation, HealioResult, PipelineConfig, VitalsWindow};
use healio_ml::Rng;

const MEAN: [f64; 5] = [72.0, 120.0, 80.0, 98.0, 1.0];
const STD: [f64; 5] = [3.0, 5.0, 4.0, 0.5, 0.3];

fn resting_window(rng: &mut Rng, config: &PipelineConfig) -> HealioResult<VitalsWindow> {
    let rows: Vec<Vec<f64>> = (0..config.timesteps)
        .map(|_| {
            (0..MEAN.len())
                .map(|f| {
                    let v = MEAN[f] + STD[f] * rng.next_gaussian();
                    if f == 4 { v.round().clamp(0.0, 3.0) } else { v }
                })
                .collect()
        })
        .collect();
    VitalsWindow::from_rows(&rows, config)
}

fn main() -> HealioResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default();
    let mut rng = Rng::new(7);

    let windows = (0..300)
        .map(|_| resting_window(&mut rng, &config))
        .collect::<HealioResult<Vec<_>>>()?;
    let pipeline = calibrate(&BaselinePopulation::new(windows), &config)?;

    let report = pipeline.calibration_report();
    println!("=== Calibration ===");
    println!("  windows:             {}", report.population_size);
    println!("  quantum threshold:   {:.4}", report.quantum_threshold.value);
    println!("  classical threshold: {:.4}", report.classical_threshold.value);
    println!("  explained variance:  {:.1}%", report.explained_variance.total_ratio() * 100.0);

    let resting = resting_window(&mut rng, &config)?;
    let episode = VitalsWindow::constant(&[220.0, 120.0, 80.0, 70.0, 1.0], &config)?;

    for (name, window) in [("resting", &resting), ("episode", &episode)] {
        let breakdown = pipeline.inspect(window)?;
        println!("\n=== {name} ===");
        println!("  {}", breakdown.prediction.to_json()?);
        println!(
            "  quantum anomaly: {}  classical anomaly: {}",
            breakdown.quantum_anomaly, breakdown.classical_anomaly
        );
        if let Some(severity) = breakdown.prediction.alert.severity() {
            println!("  raise {severity:?} anomaly: {}", breakdown.prediction.alert);
        }
        for finding in breakdown.prediction.risk_findings() {
            println!("  {:?}: {}", finding.severity, finding.description());
        }
    }

    let partial: Vec<Vec<f64>> = (0..20).map(|t| vec![75.0 + t as f64 * 0.2, 122.0, 81.0]).collect();
    let result = pipeline.score_rows(&partial)?;
    println!("\n=== partial upload (20x3) ===");
    println!("  {}", result.to_json()?);

    Ok(())
}
