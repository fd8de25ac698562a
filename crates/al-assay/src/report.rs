//! Batch-level assay report assembled from a cycle's observations.

use serde::{Deserialize, Serialize};

use al_types::{round_to, AlResult, AssayError, Observation};

use crate::synthesizer::AssayConfig;

/// Expression yield above which a variant counts as successfully produced.
pub const EXPRESSION_SUCCESS_MG_PER_L: f64 = 20.0;

/// Fixed instrument conditions reported with every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayConditions {
    pub instrument: String,
    pub sensor_chip: String,
    pub running_buffer: String,
    pub temperature_c: f64,
    pub flow_rate_ul_per_min: f64,
}

impl Default for AssayConditions {
    fn default() -> Self {
        Self {
            instrument: "Biacore 8K".to_string(),
            sensor_chip: "CM5".to_string(),
            running_buffer: "HBS-EP+".to_string(),
            temperature_c: 25.0,
            flow_rate_ul_per_min: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayReport {
    pub assay_type: String,
    pub target_protein: String,
    pub variants_measured: usize,
    pub best_kd_nm: f64,
    pub median_kd_nm: f64,
    pub kd_range_nm: (f64, f64),
    pub yield_range_mg_per_l: (f64, f64),
    /// Fraction of variants expressing above the success cutoff.
    pub expression_success_rate: f64,
    pub conditions: AssayConditions,
}

impl AssayReport {
    pub fn from_observations(
        config: &AssayConfig,
        observations: &[Observation],
    ) -> AlResult<Self> {
        if observations.is_empty() {
            return Err(AssayError::EmptyVariantList.into());
        }

        let mut kds: Vec<f64> = observations.iter().map(|o| o.binding_kd_nm).collect();
        kds.sort_by(|a, b| a.total_cmp(b));
        let n = kds.len();
        let median = if n % 2 == 0 {
            (kds[n / 2 - 1] + kds[n / 2]) / 2.0
        } else {
            kds[n / 2]
        };

        let yields: Vec<f64> = observations
            .iter()
            .map(|o| o.expression.yield_mg_per_l)
            .collect();
        let yield_min = yields.iter().copied().fold(f64::INFINITY, f64::min);
        let yield_max = yields.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let expressing = yields
            .iter()
            .filter(|y| **y > EXPRESSION_SUCCESS_MG_PER_L)
            .count();

        Ok(Self {
            assay_type: config.assay_type.clone(),
            target_protein: config.target_protein.clone(),
            variants_measured: n,
            best_kd_nm: kds[0],
            median_kd_nm: round_to(median, 3),
            kd_range_nm: (kds[0], kds[n - 1]),
            yield_range_mg_per_l: (yield_min, yield_max),
            expression_success_rate: round_to(expressing as f64 / n as f64, 3),
            conditions: AssayConditions::default(),
        })
    }
}
