//! Decision fuser
//!
//! Stateless mapping from the two anomaly flags to a three-level alert:
//!
//! | quantum | classical | alert           |
//! |---------|-----------|-----------------|
//! | true    | true      | `HIGH_RISK`     |
//! | true    | false     | `EARLY_WARNING` |
//! | false   | any       | `NORMAL`        |
//!
//! The quantum flag gates escalation; a classical-only anomaly stays
//! `NORMAL`. Risk categories above 0.5 are reported separately as
//! [`RiskFinding`]s and never change the alert.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::risk::{RiskCategory, RiskProfile};
use crate::HealioResult;

/// Probability above which a risk category is reported
pub const RISK_FINDING_THRESHOLD: f64 = 0.5;

/// Probability above which a reported risk is high severity
pub const HIGH_SEVERITY_THRESHOLD: f64 = 0.7;

/// Fused verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// No quantum anomaly
    Normal,
    /// Quantum anomaly only
    EarlyWarning,
    /// Both detectors agree
    HighRisk,
}

impl AlertLevel {
    /// Wire string
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Normal => "NORMAL",
            AlertLevel::EarlyWarning => "EARLY_WARNING",
            AlertLevel::HighRisk => "HIGH_RISK",
        }
    }

    /// Severity of the anomaly record this alert should raise, if any
    pub fn severity(self) -> Option<Severity> {
        match self {
            AlertLevel::Normal => None,
            AlertLevel::EarlyWarning => Some(Severity::Medium),
            AlertLevel::HighRisk => Some(Severity::High),
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combine both anomaly flags into an alert
pub fn fuse(quantum_anomaly: bool, classical_anomaly: bool) -> AlertLevel {
    match (quantum_anomaly, classical_anomaly) {
        (true, true) => AlertLevel::HighRisk,
        (true, false) => AlertLevel::EarlyWarning,
        (false, _) => AlertLevel::Normal,
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth reviewing
    Medium,
    /// Needs attention
    High,
}

/// A risk category whose probability crossed the reporting threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskFinding {
    /// Category concerned
    pub category: RiskCategory,
    /// Predicted probability
    pub probability: f64,
    /// Derived severity
    pub severity: Severity,
}

impl RiskFinding {
    /// Short human-readable summary
    pub fn description(&self) -> String {
        format!("Elevated {} risk: {:.2}", self.category.display_name(), self.probability)
    }
}

/// Result of scoring one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Fused verdict
    pub alert: AlertLevel,
    /// Distance to the baseline centroid
    pub quantum_score: f64,
    /// Isolation forest outlier score
    pub classical_score: f64,
    /// Per-category risk probabilities
    pub risks: RiskProfile,
}

impl PredictionResult {
    /// Categories above the reporting threshold, in category order
    pub fn risk_findings(&self) -> Vec<RiskFinding> {
        self.risks
            .iter()
            .filter(|&(_, p)| p > RISK_FINDING_THRESHOLD)
            .map(|(category, probability)| RiskFinding {
                category,
                probability,
                severity: if probability > HIGH_SEVERITY_THRESHOLD {
                    Severity::High
                } else {
                    Severity::Medium
                },
            })
            .collect()
    }

    /// JSON object with keys `alert`, `quantum_score`, `classical_score`, `risks`
    pub fn to_json(&self) -> HealioResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
