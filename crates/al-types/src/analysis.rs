use serde::{Deserialize, Serialize};

/// KD distribution summary over one cycle's observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdDistribution {
    pub mean: f64,
    /// Sample standard deviation; defined as 0 when n <= 1.
    pub std: f64,
    pub range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingResults {
    pub best_kd_nm: f64,
    pub median_kd_nm: f64,
    pub distribution: KdDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementMetrics {
    /// Pre-optimization baseline KD divided by the cycle's best KD.
    pub improvement_factor: f64,
    /// min(100, target / best * 100).
    pub target_progress_percent: f64,
    /// Count of observations with KD at or below the target (`<=` semantics).
    pub variants_better_than_target: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    /// Improvement factor above the 1.5x significance threshold.
    pub significant_improvement: bool,
    /// Normal-approximation 95% CI on the mean: mean ± 1.96·stderr.
    pub confidence_interval_95: (f64, f64),
    /// Values outside the 1.5×IQR fences (index-based quartiles).
    pub outliers: Vec<f64>,
}

/// Derived statistics over one completed cycle's observation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAnalysis {
    pub cycle_number: u32,
    pub variants_tested: usize,
    pub binding: BindingResults,
    pub improvement: ImprovementMetrics,
    pub statistics: StatisticalSummary,
    /// Set when the batch was empty/malformed and the documented synthetic
    /// series was substituted.
    pub used_fallback_series: bool,
}
