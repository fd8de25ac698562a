//! Liquid-handler sample preparation: protocol script generation and a
//! simulated run of the deck. A successful automated prep is what entitles
//! the synthesizer to its reduced-noise regime.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use al_types::{round_to, AlResult, AutomationError};

use crate::noise::gauss;

/// Serial dilution series prepared per sample, in nM.
pub const DILUTION_SERIES_NM: [f64; 6] = [100.0, 33.3, 11.1, 3.7, 1.2, 0.4];

/// Average CV below which preparation counts as excellent.
pub const EXCELLENT_CV_PERCENT: f64 = 2.0;

const SETUP_MINUTES: f64 = 15.0;
const PER_SAMPLE_MINUTES: f64 = 1.2;
const CLEANUP_MINUTES: f64 = 5.0;
const MIN_RUN_MINUTES: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrepQuality {
    Excellent,
    Good,
}

/// Outcome of one simulated preparation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePrepReport {
    /// Wells prepared: variants times dilution points.
    pub samples_prepared: usize,
    pub per_sample_cv_percent: Vec<f64>,
    pub average_cv_percent: f64,
    pub quality: PrepQuality,
    /// 100 − average CV.
    pub accuracy_percent: f64,
    pub run_minutes: f64,
    pub success: bool,
}

/// Sample preparation front-end for the assay step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepAutomation;

impl PrepAutomation {
    pub fn new() -> Self {
        Self
    }

    /// Render the deck-layout script for a batch. The script is archival
    /// output, not executed by this crate.
    pub fn generate_protocol(&self, variant_ids: &[String]) -> AlResult<String> {
        if variant_ids.is_empty() {
            return Err(AutomationError::NoVariants.into());
        }
        let dilutions = DILUTION_SERIES_NM
            .iter()
            .map(|c| format!("{c} nM"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut script = String::new();
        script.push_str("# Sample preparation protocol\n");
        script.push_str("# Deck layout: plate 1 = stock, plate 2 = dilution series, plate 3 = assay\n\n");
        for (well, variant_id) in variant_ids.iter().enumerate() {
            script.push_str(&format!(
                "SAMPLE {variant_id}: stock well A{}, dilution series [{dilutions}]\n",
                well + 1
            ));
        }
        script.push_str(&format!(
            "\nRUN: aspirate/dispense serial dilution, {} samples x {} concentrations\n",
            variant_ids.len(),
            DILUTION_SERIES_NM.len()
        ));
        script.push_str("WASH: system flush, 2 cycles\n");
        Ok(script)
    }

    /// Simulate a preparation run over the batch.
    pub fn simulate(&self, variant_ids: &[String]) -> AlResult<SamplePrepReport> {
        self.simulate_with_rng(variant_ids, &mut rand::rng())
    }

    pub fn simulate_seeded(&self, variant_ids: &[String], seed: u64) -> AlResult<SamplePrepReport> {
        self.simulate_with_rng(variant_ids, &mut SmallRng::seed_from_u64(seed))
    }

    fn simulate_with_rng<R: Rng>(
        &self,
        variant_ids: &[String],
        rng: &mut R,
    ) -> AlResult<SamplePrepReport> {
        if variant_ids.is_empty() {
            return Err(AutomationError::NoVariants.into());
        }

        // Every variant is prepared across the full dilution series, so the
        // deck handles one well per variant-concentration pair.
        let wells = variant_ids.len() * DILUTION_SERIES_NM.len();
        let per_sample_cv_percent: Vec<f64> = (0..wells)
            .map(|_| round_to(gauss(rng, 1.5).abs(), 2))
            .collect();
        let average_cv_percent =
            round_to(per_sample_cv_percent.iter().sum::<f64>() / wells as f64, 2);

        let nominal = SETUP_MINUTES + PER_SAMPLE_MINUTES * wells as f64 + CLEANUP_MINUTES;
        let run_minutes =
            round_to((nominal * (1.0 + gauss(rng, 0.05))).max(MIN_RUN_MINUTES), 1);

        let quality = if average_cv_percent < EXCELLENT_CV_PERCENT {
            PrepQuality::Excellent
        } else {
            PrepQuality::Good
        };

        let report = SamplePrepReport {
            samples_prepared: wells,
            per_sample_cv_percent,
            average_cv_percent,
            quality,
            accuracy_percent: round_to(100.0 - average_cv_percent, 2),
            run_minutes,
            success: true,
        };
        info!(
            samples = wells,
            average_cv = report.average_cv_percent,
            minutes = report.run_minutes,
            "sample preparation simulated"
        );
        Ok(report)
    }
}
