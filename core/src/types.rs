//! Domain DTOs for the dashboard API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently,
//! so the integration tests catch any drift between the two crates. Wire names
//! follow the backend (`Glucose`, `BMI`, `risk_level`, ...); Rust field names
//! are snake_case.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Risk bucket assigned to a patient by the scoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Every level, in increasing severity.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// The wire form, as sent in the `risk_level` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the four risk levels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level: {0}")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    /// Case-insensitive, matching how the backend upper-cases its filter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRiskLevel(s.to_string()))
    }
}

/// Binary diagnosis label. Encoded on the wire as the integer `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Outcome {
    Negative,
    Positive,
}

impl TryFrom<u8> for Outcome {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Negative),
            1 => Ok(Outcome::Positive),
            other => Err(format!("outcome must be 0 or 1, got {other}")),
        }
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Negative => 0,
            Outcome::Positive => 1,
        }
    }
}

/// A single processed patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    /// Unix timestamp (seconds) of ingestion.
    pub timestamp: i64,
    #[serde(rename = "Pregnancies")]
    pub pregnancies: f64,
    #[serde(rename = "Glucose")]
    pub glucose: f64,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: f64,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: f64,
    #[serde(rename = "Insulin")]
    pub insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree_function: f64,
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Outcome")]
    pub outcome: Outcome,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub age_group: String,
    pub bmi_category: String,
}

impl Patient {
    pub fn is_diabetic(&self) -> bool {
        self.outcome == Outcome::Positive
    }
}

/// Payload of `GET /api/patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    pub count: u64,
    /// True when the backend stopped before exhausting the table.
    pub has_more: bool,
}

/// A patient projected onto the fields the scatter chart plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterDataPoint {
    pub patient_id: String,
    pub bmi: f64,
    pub glucose: f64,
    pub age: u32,
    pub risk_level: RiskLevel,
    pub outcome: Outcome,
}

impl From<&Patient> for ScatterDataPoint {
    fn from(patient: &Patient) -> Self {
        Self {
            patient_id: patient.patient_id.clone(),
            bmi: patient.bmi,
            glucose: patient.glucose,
            age: patient.age.max(0.0) as u32,
            risk_level: patient.risk_level,
            outcome: patient.outcome,
        }
    }
}

/// Patient counts per risk level. All four levels are always present; a
/// level missing from the payload counts as zero and unrecognised keys are
/// dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "UPPERCASE")]
pub struct RiskDistribution {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl RiskDistribution {
    pub fn get(&self, level: RiskLevel) -> u64 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }

    /// Counts in increasing severity.
    pub fn iter(&self) -> impl Iterator<Item = (RiskLevel, u64)> + '_ {
        RiskLevel::ALL.into_iter().map(move |level| (level, self.get(level)))
    }
}

/// Dataset-wide means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub glucose: f64,
    pub bmi: f64,
    pub age: f64,
}

/// Payload of `GET /api/statistics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_patients: u64,
    /// Fraction of patients with a positive outcome, in `[0, 1]`.
    pub diabetes_prevalence: f64,
    pub risk_distribution: RiskDistribution,
    pub age_distribution: BTreeMap<String, u64>,
    pub averages: Averages,
}

/// Payload of `GET /api/visualizations/distribution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionData {
    pub age_distribution: BTreeMap<String, u64>,
    pub risk_distribution: RiskDistribution,
}

/// Body of `GET /health`. Not wrapped in the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
