//! # al-analysis
//!
//! Cycle-level statistics for AffinityLoop: KD distribution summaries,
//! improvement metrics against the pre-optimization baseline, and the
//! qualitative progress assessment fed to the termination policy.

mod analyzer;
pub mod stats;

pub use analyzer::{
    CycleAnalyzer, ProgressAssessment, BASELINE_KD_NM, SIGNIFICANCE_THRESHOLD,
};
