use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::CycleAnalysis;
use crate::model::ModelSnapshot;
use crate::variant::AcquisitionFunction;

/// Cycle stage. Exactly one stage owns the cycle at a time: the generator
/// creates it in `Design`, the assay step moves it to `Test`, the analyzer
/// finishes it in `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStage {
    Design,
    Test,
    Complete,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Design => write!(f, "design"),
            Self::Test => write!(f, "test"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// One DMTA iteration, keyed by `(project_id, cycle_number)` with
/// `cycle_number` strictly increasing from 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub project_id: Uuid,
    pub cycle_number: u32,
    pub stage: CycleStage,
    pub acquisition_function: AcquisitionFunction,
    /// Snapshot of the surrogate used to generate this cycle's candidates.
    pub design_model: ModelSnapshot,
    /// Candidate batch, by variant id (variants are stored separately).
    pub variant_ids: Vec<String>,
    /// Filled in by the analyzer when the cycle completes.
    pub analysis: Option<CycleAnalysis>,
    /// Snapshot of the surrogate refit after this cycle's observations.
    pub final_model: Option<ModelSnapshot>,
    pub analysis_id: Option<String>,
    pub best_kd_nm: Option<f64>,
    pub target_achieved: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cycle {
    pub fn new(
        project_id: Uuid,
        cycle_number: u32,
        acquisition_function: AcquisitionFunction,
        design_model: ModelSnapshot,
        variant_ids: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            project_id,
            cycle_number,
            stage: CycleStage::Design,
            acquisition_function,
            design_model,
            variant_ids,
            analysis: None,
            final_model: None,
            analysis_id: None,
            best_kd_nm: None,
            target_achieved: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_tested(&mut self) {
        self.stage = CycleStage::Test;
        self.updated_at = Utc::now();
    }

    pub fn mark_complete(
        &mut self,
        analysis_id: String,
        analysis: CycleAnalysis,
        final_model: ModelSnapshot,
    ) {
        self.stage = CycleStage::Complete;
        self.best_kd_nm = Some(analysis.binding.best_kd_nm);
        self.target_achieved = Some(analysis.improvement.variants_better_than_target > 0);
        self.analysis_id = Some(analysis_id);
        self.analysis = Some(analysis);
        self.final_model = Some(final_model);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Hyperparameters, RegionImportance, TrainingPoints};

    fn snapshot(cycle: u32) -> ModelSnapshot {
        ModelSnapshot {
            cycle,
            training_points: TrainingPoints::default(),
            accuracy_r2: 0.76,
            rmse_log_kd: 0.28,
            uncertainty: 0.35,
            hyperparameters: Hyperparameters {
                length_scale: 1.2,
                signal_variance: 0.8,
                noise_variance: 0.14,
            },
            region_importance: RegionImportance::default(),
        }
    }

    fn analysis(cycle: u32) -> CycleAnalysis {
        use crate::analysis::*;
        CycleAnalysis {
            cycle_number: cycle,
            variants_tested: 8,
            binding: BindingResults {
                best_kd_nm: 0.9,
                median_kd_nm: 1.6,
                distribution: KdDistribution {
                    mean: 1.6,
                    std: 0.5,
                    range: (0.9, 2.4),
                },
            },
            improvement: ImprovementMetrics {
                improvement_factor: 3.11,
                target_progress_percent: 100.0,
                variants_better_than_target: 1,
            },
            statistics: StatisticalSummary {
                significant_improvement: true,
                confidence_interval_95: (1.25, 1.95),
                outliers: vec![],
            },
            used_fallback_series: false,
        }
    }

    #[test]
    fn cycle_stage_progression() {
        let mut cycle = Cycle::new(
            Uuid::new_v4(),
            1,
            AcquisitionFunction::ExpectedImprovement,
            snapshot(1),
            vec!["VAR_1_01".into()],
        );
        assert_eq!(cycle.stage, CycleStage::Design);

        cycle.mark_tested();
        assert_eq!(cycle.stage, CycleStage::Test);

        cycle.mark_complete("ANALYSIS_1".into(), analysis(1), snapshot(1));
        assert_eq!(cycle.stage, CycleStage::Complete);
        assert_eq!(cycle.best_kd_nm, Some(0.9));
        assert_eq!(cycle.target_achieved, Some(true));
        assert!(cycle.analysis.is_some());
        assert!(cycle.final_model.is_some());
    }
}
