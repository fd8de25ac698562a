//! The DMTA loop orchestrator: design, make/test, analyze, decide.
//!
//! Each step persists its entities before returning, so a campaign can be
//! inspected (or resumed from records) between steps. Store failures always
//! propagate; there is no silent degradation on the persistence path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use al_analysis::{CycleAnalyzer, ProgressAssessment};
use al_assay::{AssayConfig, AssayReport, PrepAutomation, ResultSynthesizer, SamplePrepReport};
use al_optimizer::{CandidateGenerator, Decision, SurrogateUpdater, TerminationPolicy};
use al_store::{
    cycle_record, variant_from_record, variant_record, EntityKind, FieldValue, ObjectStore,
    PersistenceService,
};
use al_types::{
    AcquisitionFunction, AlResult, Cycle, CycleAnalysis, ModelSnapshot, Observation, Project,
    StoreError, Variant,
};

/// Outcome of the make/test step for one cycle.
#[derive(Debug, Clone)]
pub struct MakeTestOutcome {
    pub observations: Vec<Observation>,
    pub report: AssayReport,
    pub prep: Option<SamplePrepReport>,
}

/// End-of-campaign summary returned by [`DmtaEngine::run_project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRunSummary {
    pub project_id: String,
    pub cycles_completed: u32,
    pub best_kd_nm: f64,
    pub decision: Decision,
}

/// Orchestrates one campaign, strictly sequential per project.
#[derive(Debug)]
pub struct DmtaEngine {
    store: Arc<dyn PersistenceService>,
    objects: Arc<dyn ObjectStore>,
    updater: SurrogateUpdater,
    generator: CandidateGenerator,
    analyzer: CycleAnalyzer,
    policy: TerminationPolicy,
    automation: PrepAutomation,
}

impl DmtaEngine {
    pub fn new(store: Arc<dyn PersistenceService>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            objects,
            updater: SurrogateUpdater::new(),
            generator: CandidateGenerator::new(),
            analyzer: CycleAnalyzer::new(),
            policy: TerminationPolicy::new(),
            automation: PrepAutomation::new(),
        }
    }

    pub(crate) fn cycle_key(project: &Project, cycle_number: u32) -> String {
        format!("{}#C{cycle_number}", project.project_id)
    }

    fn variant_key(project: &Project, variant_id: &str) -> String {
        format!("{}#{variant_id}", project.project_id)
    }

    /// Observed training points before `cycle_number`: everything up to the
    /// previous cycle is historical, the previous cycle itself is current.
    async fn training_counts(
        &self,
        project: &Project,
        cycle_number: u32,
    ) -> AlResult<(usize, usize)> {
        let records = self
            .store
            .query_by_partition(EntityKind::Variant, &project.project_id.to_string())
            .await?;
        let mut historical = 0;
        let mut current = 0;
        for record in &records {
            let variant = variant_from_record(record)?;
            if variant.observation.is_none() {
                continue;
            }
            if variant.cycle_number + 1 == cycle_number {
                current += 1;
            } else if variant.cycle_number < cycle_number {
                historical += 1;
            }
        }
        Ok((historical, current))
    }

    /// Cumulative observed variants from cycles before `cycle_number`. The
    /// analyze-time refit passes the freshly measured batch separately, so
    /// everything older belongs in the historical count.
    async fn observed_points_before(&self, project: &Project, cycle_number: u32) -> AlResult<usize> {
        let (historical, previous_batch) = self.training_counts(project, cycle_number).await?;
        Ok(historical + previous_batch)
    }

    async fn load_cycle_variants(
        &self,
        project: &Project,
        cycle: &Cycle,
    ) -> AlResult<Vec<Variant>> {
        let mut variants = Vec::with_capacity(cycle.variant_ids.len());
        for variant_id in &cycle.variant_ids {
            let key = Self::variant_key(project, variant_id);
            let record = self
                .store
                .get(EntityKind::Variant, &key)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    kind: EntityKind::Variant.to_string(),
                    key: key.clone(),
                })?;
            variants.push(variant_from_record(&record)?);
        }
        Ok(variants)
    }

    async fn put_variant(&self, project: &Project, variant: &Variant) -> AlResult<()> {
        let mut record = variant_record(variant)?;
        // Variants carry no project reference of their own; the partition key
        // is attached at the persistence boundary.
        record.insert(
            "project_id".to_string(),
            FieldValue::str(project.project_id.to_string()),
        );
        self.store
            .put(
                EntityKind::Variant,
                &Self::variant_key(project, &variant.variant_id),
                record,
            )
            .await
    }

    async fn put_cycle(&self, project: &Project, cycle: &Cycle) -> AlResult<()> {
        self.store
            .put(
                EntityKind::Cycle,
                &Self::cycle_key(project, cycle.cycle_number),
                cycle_record(cycle)?,
            )
            .await
    }

    /// Design step: refresh the surrogate from everything observed so far and
    /// propose the next ranked candidate batch.
    #[instrument(skip(self, project), fields(project_id = %project.project_id))]
    pub async fn design_cycle(
        &self,
        project: &Project,
        cycle_number: u32,
        acquisition_function: AcquisitionFunction,
        batch_size: usize,
    ) -> AlResult<Cycle> {
        let (historical, current) = self.training_counts(project, cycle_number).await?;
        let snapshot = self.updater.update(historical, current, cycle_number);

        let variants = self.generator.propose(
            &project.parent_sequence,
            cycle_number,
            acquisition_function,
            batch_size,
            &snapshot,
        )?;
        for variant in &variants {
            self.put_variant(project, variant).await?;
        }

        let variant_ids = variants.iter().map(|v| v.variant_id.clone()).collect();
        let cycle = Cycle::new(
            project.project_id,
            cycle_number,
            acquisition_function,
            snapshot,
            variant_ids,
        );
        self.put_cycle(project, &cycle).await?;

        info!(
            cycle_number,
            batch = batch_size,
            %acquisition_function,
            uncertainty = cycle.design_model.uncertainty,
            "cycle designed"
        );
        Ok(cycle)
    }

    /// Make/test step: optional automated sample preparation, simulated
    /// expression and SPR measurement, observations recorded on the variants.
    #[instrument(skip(self, project, cycle), fields(project_id = %project.project_id, cycle_number = cycle.cycle_number))]
    pub async fn make_test(
        &self,
        project: &Project,
        cycle: &mut Cycle,
        use_automation: bool,
    ) -> AlResult<MakeTestOutcome> {
        let mut variants = self.load_cycle_variants(project, cycle).await?;

        let prep = if use_automation {
            let protocol = self.automation.generate_protocol(&cycle.variant_ids)?;
            self.objects
                .put(
                    &format!(
                        "projects/{}/cycles/{}/prep_protocol.txt",
                        project.project_id, cycle.cycle_number
                    ),
                    protocol.as_bytes(),
                )
                .await?;
            Some(self.automation.simulate(&cycle.variant_ids)?)
        } else {
            None
        };
        // A verified automated prep entitles the assay to its low-noise regime
        let automated_prep = prep.as_ref().is_some_and(|p| p.success);

        let config = AssayConfig {
            target_protein: project.target_molecule.clone(),
            automated_prep,
            ..AssayConfig::default()
        };
        let synthesizer = ResultSynthesizer::new(config);
        let observations = synthesizer.run(&variants)?;

        for (variant, observation) in variants.iter_mut().zip(observations.iter().cloned()) {
            variant.record_observation(observation)?;
            self.put_variant(project, variant).await?;
        }

        cycle.mark_tested();
        self.put_cycle(project, cycle).await?;

        self.objects
            .put(
                &format!(
                    "projects/{}/cycles/{}/assay_results.json",
                    project.project_id, cycle.cycle_number
                ),
                serde_json::to_vec_pretty(&observations)?.as_slice(),
            )
            .await?;

        let report = AssayReport::from_observations(synthesizer.config(), &observations)?;
        info!(
            best_kd_nm = report.best_kd_nm,
            automated_prep, "cycle batch measured"
        );
        Ok(MakeTestOutcome {
            observations,
            report,
            prep,
        })
    }

    /// Analyze step: distribution and improvement statistics, the post-cycle
    /// surrogate refit, and the completed cycle record.
    #[instrument(skip(self, project, cycle), fields(project_id = %project.project_id, cycle_number = cycle.cycle_number))]
    pub async fn analyze_cycle(
        &self,
        project: &Project,
        cycle: &mut Cycle,
    ) -> AlResult<(CycleAnalysis, ModelSnapshot)> {
        let variants = self.load_cycle_variants(project, cycle).await?;
        let observations: Vec<Observation> = variants
            .iter()
            .filter_map(|v| v.observation.clone())
            .collect();

        let analysis =
            self.analyzer
                .analyze(&observations, cycle.cycle_number, project.target_kd_nm);

        let historical = self
            .observed_points_before(project, cycle.cycle_number)
            .await?;
        let final_model =
            self.updater
                .update(historical, observations.len(), cycle.cycle_number);

        let assessment = ProgressAssessment::derive(&analysis, &final_model, &observations);
        let analysis_id = format!("ANALYSIS_{}_C{}", project.project_id, cycle.cycle_number);
        cycle.mark_complete(analysis_id.clone(), analysis.clone(), final_model.clone());
        self.put_cycle(project, cycle).await?;

        self.objects
            .put(
                &format!(
                    "projects/{}/cycles/{}/analysis.json",
                    project.project_id, cycle.cycle_number
                ),
                serde_json::to_vec_pretty(&json!({
                    "analysis_id": analysis_id,
                    "analysis": analysis,
                    "model": final_model,
                    "assessment": assessment,
                }))?
                .as_slice(),
            )
            .await?;

        info!(
            best_kd_nm = analysis.binding.best_kd_nm,
            improvement_factor = analysis.improvement.improvement_factor,
            target_met = assessment.target_met,
            "cycle analyzed"
        );
        Ok((analysis, final_model))
    }

    /// Run a full campaign: design, make/test and analyze cycles until the
    /// termination policy issues a stop. Stop decisions are absorbing; the
    /// policy is never consulted again for a finished project.
    #[instrument(skip(self, project), fields(project_id = %project.project_id))]
    pub async fn run_project(&self, project: &mut Project) -> AlResult<ProjectRunSummary> {
        project.mark_active();
        self.store
            .put(
                EntityKind::Project,
                &project.project_id.to_string(),
                al_store::project_record(project)?,
            )
            .await?;

        let mut acquisition_function = AcquisitionFunction::ExpectedImprovement;
        let mut batch_size = project.variants_per_cycle;
        let mut cycle_number = 1;
        let mut best_kd_nm = f64::INFINITY;

        let decision = loop {
            let mut cycle = self
                .design_cycle(project, cycle_number, acquisition_function, batch_size)
                .await?;
            self.make_test(project, &mut cycle, true).await?;
            let (analysis, final_model) = self.analyze_cycle(project, &mut cycle).await?;

            best_kd_nm = best_kd_nm.min(analysis.binding.best_kd_nm);

            match self.policy.evaluate(
                best_kd_nm,
                project.target_kd_nm,
                &final_model,
                cycle_number,
            ) {
                Decision::Continue(plan) => {
                    info!(
                        next_cycle = cycle_number + 1,
                        strategy = %plan.strategy_label,
                        batch = plan.batch_size,
                        "continuing campaign"
                    );
                    acquisition_function = plan.acquisition_function;
                    batch_size = plan.batch_size;
                    cycle_number += 1;
                }
                stop => break stop,
            }
        };

        project.mark_complete();
        self.store
            .put(
                EntityKind::Project,
                &project.project_id.to_string(),
                al_store::project_record(project)?,
            )
            .await?;

        let summary = ProjectRunSummary {
            project_id: project.project_id.to_string(),
            cycles_completed: cycle_number,
            best_kd_nm,
            decision,
        };
        info!(
            cycles = summary.cycles_completed,
            best_kd_nm = summary.best_kd_nm,
            reason = summary.decision.termination_reason(),
            "campaign finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use al_store::{MemoryObjectStore, MemoryStore};
    use al_types::{CycleStage, ProjectStatus};

    fn engine() -> (Arc<MemoryStore>, Arc<MemoryObjectStore>, DmtaEngine) {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let engine = DmtaEngine::new(store.clone(), objects.clone());
        (store, objects, engine)
    }

    fn project() -> Project {
        Project::new("Cablivi", "Improve vWF binding affinity", 1.0)
    }

    #[tokio::test]
    async fn design_cycle_persists_batch_and_cycle() {
        let (store, _, engine) = engine();
        let project = project();

        let cycle = engine
            .design_cycle(&project, 1, AcquisitionFunction::ExpectedImprovement, 8)
            .await
            .unwrap();

        assert_eq!(cycle.stage, CycleStage::Design);
        assert_eq!(cycle.variant_ids.len(), 8);
        assert_eq!(cycle.variant_ids[0], "VAR_1_01");
        assert_eq!(cycle.design_model.training_points.total, 0);

        let variants = store
            .query_by_partition(EntityKind::Variant, &project.project_id.to_string())
            .await
            .unwrap();
        assert_eq!(variants.len(), 8);
        assert!(store
            .get(EntityKind::Cycle, &format!("{}#C1", project.project_id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn make_test_records_observations_once() {
        let (store, objects, engine) = engine();
        let project = project();
        let mut cycle = engine
            .design_cycle(&project, 1, AcquisitionFunction::ExpectedImprovement, 6)
            .await
            .unwrap();

        let outcome = engine.make_test(&project, &mut cycle, true).await.unwrap();
        assert_eq!(outcome.observations.len(), 6);
        assert_eq!(cycle.stage, CycleStage::Test);
        let prep = outcome.prep.unwrap();
        assert!(prep.success);
        // 6 variants, each prepared across the 6-point dilution series
        assert_eq!(prep.samples_prepared, 36);

        let keys = objects.list().await.unwrap();
        assert!(keys.iter().any(|k| k.ends_with("assay_results.json")));
        assert!(keys.iter().any(|k| k.ends_with("prep_protocol.txt")));

        // Observations are recorded on the persisted variants
        let variants = store
            .query_by_partition(EntityKind::Variant, &project.project_id.to_string())
            .await
            .unwrap();
        assert!(variants
            .iter()
            .all(|r| variant_from_record(r).unwrap().observation.is_some()));

        // A second measurement pass is rejected, not overwritten
        let err = engine.make_test(&project, &mut cycle, false).await.unwrap_err();
        assert!(err.to_string().contains("already recorded"));
    }

    #[tokio::test]
    async fn analyze_cycle_completes_the_record() {
        let (store, objects, engine) = engine();
        let project = project();
        let mut cycle = engine
            .design_cycle(&project, 1, AcquisitionFunction::ExpectedImprovement, 8)
            .await
            .unwrap();
        engine.make_test(&project, &mut cycle, false).await.unwrap();

        let (analysis, final_model) = engine.analyze_cycle(&project, &mut cycle).await.unwrap();

        assert_eq!(cycle.stage, CycleStage::Complete);
        assert_eq!(analysis.variants_tested, 8);
        assert!(!analysis.used_fallback_series);
        assert_eq!(final_model.training_points.current_cycle, 8);
        assert_eq!(cycle.best_kd_nm, Some(analysis.binding.best_kd_nm));

        let stored = store
            .get(EntityKind::Cycle, &format!("{}#C1", project.project_id))
            .await
            .unwrap()
            .unwrap();
        let stored = al_store::cycle_from_record(&stored).unwrap();
        assert_eq!(stored.stage, CycleStage::Complete);
        assert!(stored.analysis.is_some());

        let keys = objects.list().await.unwrap();
        assert!(keys.iter().any(|k| k.ends_with("cycles/1/analysis.json")));
    }

    #[tokio::test]
    async fn run_project_loops_until_stop() {
        let (store, _, engine) = engine();
        let mut project = project();
        let project_id = project.project_id.to_string();
        store
            .put(
                EntityKind::Project,
                &project_id,
                al_store::project_record(&project).unwrap(),
            )
            .await
            .unwrap();

        let summary = engine.run_project(&mut project).await.unwrap();

        // The policy's cycle budget bounds every campaign
        assert!(summary.cycles_completed >= 1 && summary.cycles_completed <= 6);
        assert!(summary.decision.is_stop());
        assert!(summary.best_kd_nm.is_finite());
        assert_eq!(project.status, ProjectStatus::Complete);

        let cycles = store
            .query_by_partition(EntityKind::Cycle, &project_id)
            .await
            .unwrap();
        assert_eq!(cycles.len(), summary.cycles_completed as usize);
        for record in &cycles {
            let cycle = al_store::cycle_from_record(record).unwrap();
            assert_eq!(cycle.stage, CycleStage::Complete);
        }

        let stored = store
            .get(EntityKind::Project, &project_id)
            .await
            .unwrap()
            .unwrap();
        let stored = al_store::project_from_record(&stored).unwrap();
        assert_eq!(stored.status, ProjectStatus::Complete);
    }

    #[tokio::test]
    async fn later_cycles_train_on_prior_observations() {
        let (_, _, engine) = engine();
        let project = project();
        let mut cycle = engine
            .design_cycle(&project, 1, AcquisitionFunction::ExpectedImprovement, 8)
            .await
            .unwrap();
        engine.make_test(&project, &mut cycle, false).await.unwrap();
        engine.analyze_cycle(&project, &mut cycle).await.unwrap();

        let second = engine
            .design_cycle(&project, 2, AcquisitionFunction::Ucb, 6)
            .await
            .unwrap();
        assert_eq!(second.design_model.training_points.current_cycle, 8);
        assert_eq!(second.design_model.training_points.total, 8);
        // Uncertainty shrinks as cycles accumulate
        assert!(second.design_model.uncertainty < cycle.design_model.uncertainty);
    }

    #[tokio::test]
    async fn analyze_refits_on_the_cumulative_training_set() {
        let (_, _, engine) = engine();
        let project = project();

        for cycle_number in 1..=2 {
            let mut cycle = engine
                .design_cycle(
                    &project,
                    cycle_number,
                    AcquisitionFunction::ExpectedImprovement,
                    8,
                )
                .await
                .unwrap();
            engine.make_test(&project, &mut cycle, false).await.unwrap();
            let (_, final_model) = engine.analyze_cycle(&project, &mut cycle).await.unwrap();

            // Every observation measured so far trains the refit, not just
            // the latest batch.
            assert_eq!(
                final_model.training_points.total,
                cycle_number as usize * 8
            );
            assert_eq!(final_model.training_points.current_cycle, 8);
            if cycle_number == 2 {
                assert_eq!(final_model.training_points.historical, 8);
                // 16 points saturate the data-driven accuracy bonus
                assert_eq!(final_model.accuracy_r2, 0.9);
            }
        }
    }
}
