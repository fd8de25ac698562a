//! # al-assay
//!
//! Simulated wet-lab measurement for AffinityLoop: protein expression, SPR
//! kinetics with steady-state dose-response curves, batch reporting, and the
//! liquid-handler sample-preparation front-end. No instrument is driven from
//! here; the simulation reproduces the statistical shape of real campaigns.

mod automation;
mod noise;
mod report;
mod synthesizer;

pub use automation::{
    PrepAutomation, PrepQuality, SamplePrepReport, DILUTION_SERIES_NM, EXCELLENT_CV_PERCENT,
};
pub use report::{AssayConditions, AssayReport, EXPRESSION_SUCCESS_MG_PER_L};
pub use synthesizer::{
    AssayConfig, ResultSynthesizer, AUTOMATED_PRECISION_FACTOR, DOSE_SERIES_NM,
};
