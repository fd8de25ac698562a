use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caplacizumab-derived parent nanobody sequence used when a project does not
/// supply its own starting point.
pub const DEFAULT_PARENT_SEQUENCE: &str = "QVQLVESGGGLVQPGGSLRLSCAASGFTFSSYAMSWVRQAPGKGLEWVSAISGSGGSTYYADSVKGRFTISRDNSKNTLYLQMNSLRAEDTAVYYCAKVSYLSTASSLDYWGQGTLVTVSS";

/// Project lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Planned,
    Active,
    Complete,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planned => write!(f, "planned"),
            Self::Active => write!(f, "active"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// An affinity-optimization campaign. Created once at planning time; only the
/// status and summary fields change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: Uuid,
    /// Parent molecule being optimized (e.g. "Cablivi").
    pub target_molecule: String,
    /// Free-text optimization objective.
    pub objective: String,
    /// Target dissociation constant in nM (lower is tighter binding).
    pub target_kd_nm: f64,
    pub timeline_weeks: u32,
    pub cycles_planned: u32,
    pub variants_per_cycle: usize,
    /// Starting sequence that all cycle-1 candidates mutate from.
    pub parent_sequence: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        target_molecule: impl Into<String>,
        objective: impl Into<String>,
        target_kd_nm: f64,
    ) -> Self {
        Self {
            project_id: Uuid::new_v4(),
            target_molecule: target_molecule.into(),
            objective: objective.into(),
            target_kd_nm,
            timeline_weeks: 8,
            cycles_planned: 3,
            variants_per_cycle: 8,
            parent_sequence: DEFAULT_PARENT_SEQUENCE.to_string(),
            status: ProjectStatus::Planned,
            created_at: Utc::now(),
        }
    }

    pub fn with_timeline_weeks(mut self, weeks: u32) -> Self {
        self.timeline_weeks = weeks;
        self
    }

    pub fn with_cycles_planned(mut self, cycles: u32) -> Self {
        self.cycles_planned = cycles;
        self
    }

    pub fn with_variants_per_cycle(mut self, n: usize) -> Self {
        self.variants_per_cycle = n;
        self
    }

    pub fn with_parent_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.parent_sequence = sequence.into();
        self
    }

    pub fn mark_active(&mut self) {
        self.status = ProjectStatus::Active;
    }

    pub fn mark_complete(&mut self) {
        self.status = ProjectStatus::Complete;
    }
}
