use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AlResult, AssayError};

/// Acquisition strategy used to rank candidate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionFunction {
    ExpectedImprovement,
    Ucb,
}

impl AcquisitionFunction {
    /// Parse the human-readable strategy names used in invocation parameters.
    /// Unknown values fall back to Expected Improvement (the documented
    /// default), never an error.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ucb" | "upper confidence bound" => Self::Ucb,
            _ => Self::ExpectedImprovement,
        }
    }
}

impl std::fmt::Display for AcquisitionFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExpectedImprovement => write!(f, "Expected Improvement"),
            Self::Ucb => write!(f, "UCB"),
        }
    }
}

/// A single point substitution, displayed in standard notation (e.g. `A48V`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub position: u32,
    pub original: char,
    pub replacement: char,
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.original, self.position, self.replacement)
    }
}

/// Per-variant expression results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionData {
    pub yield_mg_per_l: f64,
    pub purity_percent: f64,
    pub aggregation_percent: f64,
}

/// SPR kinetic rate constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kinetics {
    /// Association rate constant (1/M·s).
    pub ka_per_m_per_s: f64,
    /// Dissociation rate constant (1/s).
    pub kd_per_s: f64,
    /// Maximum binding response (RU).
    pub rmax_ru: f64,
}

/// Steady-state dose-response curve, kept per variant for traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseResponse {
    pub concentrations_nm: Vec<f64>,
    pub responses_ru: Vec<f64>,
    pub r_squared: f64,
}

/// The three independently-noised quality sub-factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFactors {
    pub expression_quality: f64,
    pub binding_specificity: f64,
    pub stability_score: f64,
}

/// A measured wet-lab (simulated) result for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub variant_id: String,
    pub expression: ExpressionData,
    /// Equilibrium dissociation constant in nM, the optimization metric.
    pub binding_kd_nm: f64,
    pub kinetics: Kinetics,
    pub dose_response: DoseResponse,
    pub quality_score: f64,
    pub quality_factors: QualityFactors,
    pub measured_at: DateTime<Utc>,
}

/// A candidate sequence belonging to exactly one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Identifier of the form `VAR_{cycle}_{index:02}`.
    pub variant_id: String,
    pub cycle_number: u32,
    pub sequence: String,
    pub mutations: Vec<Mutation>,
    /// Predicted KD in nM from the surrogate model.
    pub predicted_affinity_nm: f64,
    pub acquisition_score: f64,
    pub acquisition_function: AcquisitionFunction,
    /// Recorded once by the assay step; immutable afterwards.
    pub observation: Option<Observation>,
    pub created_at: DateTime<Utc>,
}

impl Variant {
    pub fn variant_id_for(cycle_number: u32, index: usize) -> String {
        format!("VAR_{}_{:02}", cycle_number, index + 1)
    }

    /// Record the assay result. Variants are immutable once observed; a
    /// second recording is rejected rather than overwritten.
    pub fn record_observation(&mut self, observation: Observation) -> AlResult<()> {
        if self.observation.is_some() {
            return Err(AssayError::ObservationAlreadyRecorded {
                variant_id: self.variant_id.clone(),
            }
            .into());
        }
        self.observation = Some(observation);
        Ok(())
    }
}
