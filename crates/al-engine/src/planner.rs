//! Project planning: creates the campaign record and writes the kickoff plan
//! document, seeded with methodology notes from prior campaigns.

use std::sync::Arc;

use tracing::info;

use al_store::{project_record, EntityKind, ObjectStore, PersistenceService};
use al_types::{AlResult, Project};

/// A prior optimization campaign consulted for methodology insights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precedent {
    pub campaign: &'static str,
    pub target: &'static str,
    pub approach: &'static str,
    pub outcome: &'static str,
}

/// Built-in catalog of historical campaigns.
pub fn precedent_catalog() -> Vec<Precedent> {
    vec![
        Precedent {
            campaign: "NB-2019-07",
            target: "TNF-alpha",
            approach: "CDR3-focused saturation with EI ranking",
            outcome: "12-fold KD improvement over 4 cycles; CDR3 positions dominated",
        },
        Precedent {
            campaign: "NB-2021-03",
            target: "EGFR domain III",
            approach: "balanced CDR1/CDR3 double mutants, UCB in early cycles",
            outcome: "sub-nanomolar binder in cycle 3; early exploration paid off",
        },
        Precedent {
            campaign: "NB-2023-11",
            target: "vWF A1 domain",
            approach: "paired-site mutations at framework-adjacent CDR positions",
            outcome: "5-fold improvement; aggregation flagged above 8% in two variants",
        },
    ]
}

/// Options accepted at planning time; unset fields fall back to campaign
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub target_kd_nm: Option<f64>,
    pub timeline_weeks: Option<u32>,
    pub cycles_planned: Option<u32>,
    pub variants_per_cycle: Option<usize>,
    pub parent_sequence: Option<String>,
}

#[derive(Debug)]
pub struct ProjectPlanner {
    store: Arc<dyn PersistenceService>,
    objects: Arc<dyn ObjectStore>,
}

impl ProjectPlanner {
    pub fn new(store: Arc<dyn PersistenceService>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Create a planned project, persist it, and archive its kickoff plan.
    /// Returns the project and the object-store key of the plan document.
    pub async fn plan_project(
        &self,
        target_molecule: &str,
        objective: &str,
        options: PlanOptions,
    ) -> AlResult<(Project, String)> {
        let mut project =
            Project::new(target_molecule, objective, options.target_kd_nm.unwrap_or(1.0));
        if let Some(weeks) = options.timeline_weeks {
            project = project.with_timeline_weeks(weeks);
        }
        if let Some(cycles) = options.cycles_planned {
            project = project.with_cycles_planned(cycles);
        }
        if let Some(n) = options.variants_per_cycle {
            project = project.with_variants_per_cycle(n);
        }
        if let Some(sequence) = options.parent_sequence {
            project = project.with_parent_sequence(sequence);
        }

        let key = project.project_id.to_string();
        self.store
            .put(EntityKind::Project, &key, project_record(&project)?)
            .await?;

        let plan_key = format!("plans/{key}.md");
        let plan = render_plan(&project);
        self.objects.put(&plan_key, plan.as_bytes()).await?;

        info!(
            project_id = %project.project_id,
            target_molecule,
            plan_key = %plan_key,
            "project planned"
        );
        Ok((project, plan_key))
    }
}

fn render_plan(project: &Project) -> String {
    let mut doc = String::new();
    doc.push_str(&format!(
        "# Affinity optimization plan: {}\n\n",
        project.target_molecule
    ));
    doc.push_str(&format!("Project: `{}`\n\n", project.project_id));
    doc.push_str(&format!("Objective: {}\n\n", project.objective));
    doc.push_str("## Campaign parameters\n\n");
    doc.push_str(&format!("- Target KD: {} nM\n", project.target_kd_nm));
    doc.push_str(&format!("- Timeline: {} weeks\n", project.timeline_weeks));
    doc.push_str(&format!(
        "- Cycles planned: {} ({} variants per cycle)\n",
        project.cycles_planned, project.variants_per_cycle
    ));
    doc.push_str(&format!(
        "- Parent sequence: {} residues\n\n",
        project.parent_sequence.len()
    ));
    doc.push_str("## Methodology insights from prior campaigns\n\n");
    for precedent in precedent_catalog() {
        doc.push_str(&format!(
            "- **{}** ({}): {}. Outcome: {}.\n",
            precedent.campaign, precedent.target, precedent.approach, precedent.outcome
        ));
    }
    doc.push_str("\n## Cycle structure\n\n");
    doc.push_str("1. Design: surrogate update, acquisition-ranked candidate batch\n");
    doc.push_str("2. Make/Test: expression and SPR characterization\n");
    doc.push_str("3. Analyze: distribution, improvement and significance review\n");
    doc.push_str("4. Decide: continue with adjusted strategy, or stop\n");
    doc
}
