//! Read-side project reporting over persisted records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use al_store::{cycle_from_record, project_from_record, EntityKind, PersistenceService};
use al_types::{AlResult, CycleStage, Project, ProjectStatus, StoreError};

/// Per-cycle progress line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleProgress {
    pub cycle_number: u32,
    pub stage: CycleStage,
    pub best_kd_nm: Option<f64>,
    pub target_achieved: Option<bool>,
}

/// Campaign progress summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub project_id: String,
    pub target_molecule: String,
    pub status: ProjectStatus,
    /// Human-readable current phase, derived from the latest cycle's stage.
    pub current_phase: String,
    pub cycles: Vec<CycleProgress>,
    pub best_kd_nm: Option<f64>,
    pub target_kd_nm: f64,
}

#[derive(Debug)]
pub struct StatusService {
    store: Arc<dyn PersistenceService>,
}

impl StatusService {
    pub fn new(store: Arc<dyn PersistenceService>) -> Self {
        Self { store }
    }

    pub async fn project_count(&self) -> AlResult<usize> {
        Ok(self.store.list(EntityKind::Project).await?.len())
    }

    pub async fn all_projects(&self) -> AlResult<Vec<Project>> {
        self.store
            .list(EntityKind::Project)
            .await?
            .iter()
            .map(project_from_record)
            .collect()
    }

    pub async fn project_progress(&self, project_id: &str) -> AlResult<ProjectProgress> {
        let record = self
            .store
            .get(EntityKind::Project, project_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Project.to_string(),
                key: project_id.to_string(),
            })?;
        let project = project_from_record(&record)?;

        let mut cycles: Vec<CycleProgress> = self
            .store
            .query_by_partition(EntityKind::Cycle, project_id)
            .await?
            .iter()
            .map(|r| {
                cycle_from_record(r).map(|c| CycleProgress {
                    cycle_number: c.cycle_number,
                    stage: c.stage,
                    best_kd_nm: c.best_kd_nm,
                    target_achieved: c.target_achieved,
                })
            })
            .collect::<AlResult<_>>()?;
        cycles.sort_by_key(|c| c.cycle_number);

        let best_kd_nm = cycles
            .iter()
            .filter_map(|c| c.best_kd_nm)
            .fold(None, |best: Option<f64>, kd| {
                Some(best.map_or(kd, |b| b.min(kd)))
            });

        let current_phase = derive_phase(&project, &cycles);

        Ok(ProjectProgress {
            project_id: project_id.to_string(),
            target_molecule: project.target_molecule.clone(),
            status: project.status,
            current_phase,
            cycles,
            best_kd_nm,
            target_kd_nm: project.target_kd_nm,
        })
    }
}

fn derive_phase(project: &Project, cycles: &[CycleProgress]) -> String {
    if project.status == ProjectStatus::Complete {
        return "complete".to_string();
    }
    match cycles.last() {
        None => "planning".to_string(),
        Some(latest) => match latest.stage {
            CycleStage::Design => format!("designing cycle {}", latest.cycle_number),
            CycleStage::Test => format!("testing cycle {}", latest.cycle_number),
            CycleStage::Complete => {
                format!("cycle {} analyzed, awaiting decision", latest.cycle_number)
            }
        },
    }
}
