//! Function-invocation boundary: dispatches an [`Invocation`] onto the
//! planner, engine and status operations and wraps each result in a
//! [`ResponseEnvelope`].
//!
//! Flat parameters that fail to parse degrade to their documented defaults
//! with a note in the payload; only missing identifiers fail the invocation.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use al_store::{cycle_from_record, project_from_record, EntityKind, ObjectStore, PersistenceService};
use al_types::{invalid_input, AcquisitionFunction, AlResult, Cycle, Project, StoreError};

use crate::engine::DmtaEngine;
use crate::envelope::{DegradedInput, Invocation, ResponseEnvelope};
use crate::planner::{PlanOptions, ProjectPlanner};
use crate::status::StatusService;

/// Routes invocations to the campaign operations.
#[derive(Debug)]
pub struct InvocationHandler {
    store: Arc<dyn PersistenceService>,
    planner: ProjectPlanner,
    engine: DmtaEngine,
    status: StatusService,
}

impl InvocationHandler {
    pub fn new(store: Arc<dyn PersistenceService>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            planner: ProjectPlanner::new(store.clone(), objects.clone()),
            engine: DmtaEngine::new(store.clone(), objects),
            status: StatusService::new(store.clone()),
            store,
        }
    }

    #[instrument(skip(self, invocation), fields(function = %invocation.function))]
    pub async fn handle(&self, invocation: &Invocation) -> AlResult<ResponseEnvelope> {
        let payload = match invocation.function.as_str() {
            "plan_project" => self.plan_project(invocation).await?,
            "design_cycle" => self.design_cycle(invocation).await?,
            "run_test_cycle" => self.run_test_cycle(invocation).await?,
            "analyze_cycle" => self.analyze_cycle(invocation).await?,
            "run_project" => self.run_project(invocation).await?,
            "project_status" => self.project_status(invocation).await?,
            "list_projects" => self.list_projects().await?,
            other => return Err(invalid_input!("unknown function {other:?}")),
        };
        info!("invocation handled");
        Ok(ResponseEnvelope::new(invocation, &payload))
    }

    async fn plan_project(&self, invocation: &Invocation) -> AlResult<Value> {
        let target_molecule = required(invocation, "target_molecule")?;
        let objective = required(invocation, "objective")?;

        let mut notes = Vec::new();
        let constraints = if invocation.get("constraints").is_some() {
            let (value, note) = invocation.embedded_json("constraints");
            notes.extend(note);
            value
        } else {
            json!({})
        };
        let options = PlanOptions {
            target_kd_nm: constraints.get("target_kd_nm").and_then(Value::as_f64),
            timeline_weeks: constraints
                .get("timeline_weeks")
                .and_then(Value::as_u64)
                .map(|w| w as u32),
            cycles_planned: constraints
                .get("cycles_planned")
                .and_then(Value::as_u64)
                .map(|c| c as u32),
            variants_per_cycle: constraints
                .get("variants_per_cycle")
                .and_then(Value::as_u64)
                .map(|n| n as usize),
            parent_sequence: constraints
                .get("parent_sequence")
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        let (project, plan_key) = self
            .planner
            .plan_project(target_molecule, objective, options)
            .await?;
        Ok(with_notes(
            json!({
                "project_id": project.project_id,
                "target_molecule": project.target_molecule,
                "target_kd_nm": project.target_kd_nm,
                "cycles_planned": project.cycles_planned,
                "variants_per_cycle": project.variants_per_cycle,
                "plan_key": plan_key,
            }),
            notes,
        ))
    }

    async fn design_cycle(&self, invocation: &Invocation) -> AlResult<Value> {
        let project = self.load_project(invocation).await?;
        let mut notes = Vec::new();
        let cycle_number = parsed(invocation, "cycle_number", &mut notes).unwrap_or(1);
        let acquisition =
            AcquisitionFunction::parse_or_default(invocation.get("acquisition_function").unwrap_or(""));
        let batch_size =
            parsed(invocation, "batch_size", &mut notes).unwrap_or(project.variants_per_cycle);

        let cycle = self
            .engine
            .design_cycle(&project, cycle_number, acquisition, batch_size)
            .await?;
        Ok(with_notes(
            json!({
                "cycle_number": cycle.cycle_number,
                "acquisition_function": cycle.acquisition_function,
                "variant_ids": cycle.variant_ids,
                "model_uncertainty": cycle.design_model.uncertainty,
                "model_accuracy_r2": cycle.design_model.accuracy_r2,
            }),
            notes,
        ))
    }

    async fn run_test_cycle(&self, invocation: &Invocation) -> AlResult<Value> {
        let project = self.load_project(invocation).await?;
        let mut notes = Vec::new();
        let cycle_number = parsed(invocation, "cycle_number", &mut notes).unwrap_or(1);
        let use_automation = parsed(invocation, "use_automation", &mut notes).unwrap_or(true);

        let mut cycle = self.load_cycle(&project, cycle_number).await?;
        let outcome = self
            .engine
            .make_test(&project, &mut cycle, use_automation)
            .await?;
        Ok(with_notes(
            json!({
                "cycle_number": cycle_number,
                "variants_tested": outcome.observations.len(),
                "best_kd_nm": outcome.report.best_kd_nm,
                "median_kd_nm": outcome.report.median_kd_nm,
                "expression_success_rate": outcome.report.expression_success_rate,
                "sample_prep": outcome.prep,
            }),
            notes,
        ))
    }

    async fn analyze_cycle(&self, invocation: &Invocation) -> AlResult<Value> {
        let project = self.load_project(invocation).await?;
        let mut notes = Vec::new();
        let cycle_number = parsed(invocation, "cycle_number", &mut notes).unwrap_or(1);

        let mut cycle = self.load_cycle(&project, cycle_number).await?;
        let (analysis, final_model) = self.engine.analyze_cycle(&project, &mut cycle).await?;
        Ok(with_notes(
            json!({
                "analysis": analysis,
                "model": final_model,
            }),
            notes,
        ))
    }

    async fn run_project(&self, invocation: &Invocation) -> AlResult<Value> {
        let mut project = self.load_project(invocation).await?;
        let summary = self.engine.run_project(&mut project).await?;
        Ok(serde_json::to_value(&summary)?)
    }

    async fn project_status(&self, invocation: &Invocation) -> AlResult<Value> {
        let project_id = required(invocation, "project_id")?;
        let progress = self.status.project_progress(project_id).await?;
        Ok(serde_json::to_value(&progress)?)
    }

    async fn list_projects(&self) -> AlResult<Value> {
        let projects = self.status.all_projects().await?;
        Ok(json!({
            "count": projects.len(),
            "projects": projects
                .iter()
                .map(|p| {
                    json!({
                        "project_id": p.project_id,
                        "target_molecule": p.target_molecule,
                        "status": p.status,
                    })
                })
                .collect::<Vec<_>>(),
        }))
    }

    async fn load_project(&self, invocation: &Invocation) -> AlResult<Project> {
        let project_id = required(invocation, "project_id")?;
        let record = self
            .store
            .get(EntityKind::Project, project_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Project.to_string(),
                key: project_id.to_string(),
            })?;
        project_from_record(&record)
    }

    async fn load_cycle(&self, project: &Project, cycle_number: u32) -> AlResult<Cycle> {
        let key = DmtaEngine::cycle_key(project, cycle_number);
        let record = self
            .store
            .get(EntityKind::Cycle, &key)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Cycle.to_string(),
                key: key.clone(),
            })?;
        cycle_from_record(&record)
    }
}

fn required<'a>(invocation: &'a Invocation, name: &str) -> AlResult<&'a str> {
    invocation
        .get(name)
        .ok_or_else(|| invalid_input!("missing required parameter {name:?}"))
}

/// Parse an optional flat parameter. A malformed value falls back to the
/// caller's default and is noted in the payload instead of failing the
/// invocation.
fn parsed<T: FromStr>(
    invocation: &Invocation,
    name: &str,
    notes: &mut Vec<DegradedInput>,
) -> Option<T> {
    let raw = invocation.get(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(parameter = name, value = raw, "unparseable parameter, using default");
            notes.push(DegradedInput {
                parameter: name.to_string(),
                reason: format!("unparseable value {raw:?}"),
            });
            None
        }
    }
}

fn with_notes(mut payload: Value, notes: Vec<DegradedInput>) -> Value {
    if !notes.is_empty() {
        payload["degraded_inputs"] = serde_json::to_value(notes).unwrap_or(Value::Null);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use al_store::{MemoryObjectStore, MemoryStore};
    use crate::envelope::Parameter;

    fn handler() -> InvocationHandler {
        InvocationHandler::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryObjectStore::new()),
        )
    }

    fn invocation(function: &str, parameters: &[(&str, &str)]) -> Invocation {
        Invocation {
            action_group: "affinity-loop".to_string(),
            function: function.to_string(),
            parameters: parameters
                .iter()
                .map(|(name, value)| Parameter {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    async fn body(handler: &InvocationHandler, inv: &Invocation) -> Value {
        let response = handler.handle(inv).await.unwrap();
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn drives_a_full_cycle_through_the_envelope() {
        let handler = handler();

        let planned = body(
            &handler,
            &invocation(
                "plan_project",
                &[
                    ("target_molecule", "Cablivi"),
                    ("objective", "Improve vWF binding"),
                    ("constraints", r#"{"target_kd_nm": 0.5, "variants_per_cycle": 6}"#),
                ],
            ),
        )
        .await;
        assert_eq!(planned["target_kd_nm"], 0.5);
        assert!(planned["degraded_inputs"].is_null());
        let project_id = planned["project_id"].as_str().unwrap().to_string();

        let designed = body(
            &handler,
            &invocation(
                "design_cycle",
                &[
                    ("project_id", &project_id),
                    ("cycle_number", "1"),
                    ("acquisition_function", "ucb"),
                ],
            ),
        )
        .await;
        assert_eq!(designed["variant_ids"].as_array().unwrap().len(), 6);
        assert_eq!(designed["acquisition_function"], "Ucb");

        let tested = body(
            &handler,
            &invocation(
                "run_test_cycle",
                &[("project_id", &project_id), ("cycle_number", "1")],
            ),
        )
        .await;
        assert_eq!(tested["variants_tested"], 6);
        assert_eq!(tested["sample_prep"]["samples_prepared"], 36);

        let analyzed = body(
            &handler,
            &invocation(
                "analyze_cycle",
                &[("project_id", &project_id), ("cycle_number", "1")],
            ),
        )
        .await;
        assert!(analyzed["analysis"]["binding"]["best_kd_nm"].as_f64().unwrap() > 0.0);
        assert_eq!(analyzed["model"]["training_points"]["current_cycle"], 6);

        let progress = body(
            &handler,
            &invocation("project_status", &[("project_id", &project_id)]),
        )
        .await;
        assert_eq!(progress["cycles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_constraints_degrade_to_defaults() {
        let handler = handler();
        let planned = body(
            &handler,
            &invocation(
                "plan_project",
                &[
                    ("target_molecule", "Cablivi"),
                    ("objective", "Improve vWF binding"),
                    ("constraints", "{not json"),
                ],
            ),
        )
        .await;
        assert_eq!(planned["target_kd_nm"], 1.0);
        assert_eq!(planned["degraded_inputs"][0]["parameter"], "constraints");
    }

    #[tokio::test]
    async fn malformed_flat_parameter_is_noted_not_fatal() {
        let handler = handler();
        let planned = body(
            &handler,
            &invocation(
                "plan_project",
                &[("target_molecule", "Cablivi"), ("objective", "obj")],
            ),
        )
        .await;
        let project_id = planned["project_id"].as_str().unwrap().to_string();

        let designed = body(
            &handler,
            &invocation(
                "design_cycle",
                &[("project_id", &project_id), ("batch_size", "lots")],
            ),
        )
        .await;
        // Falls back to the project's configured batch size
        assert_eq!(designed["variant_ids"].as_array().unwrap().len(), 8);
        assert_eq!(designed["degraded_inputs"][0]["parameter"], "batch_size");
    }

    #[tokio::test]
    async fn unknown_function_is_rejected() {
        let handler = handler();
        let err = handler
            .handle(&invocation("launch_rockets", &[]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown function"));
    }

    #[tokio::test]
    async fn missing_project_id_is_rejected() {
        let handler = handler();
        let err = handler
            .handle(&invocation("design_cycle", &[]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("project_id"));
    }

    #[tokio::test]
    async fn run_project_and_listing_round_trip() {
        let handler = handler();
        let planned = body(
            &handler,
            &invocation(
                "plan_project",
                &[("target_molecule", "Cablivi"), ("objective", "obj")],
            ),
        )
        .await;
        let project_id = planned["project_id"].as_str().unwrap().to_string();

        let summary = body(
            &handler,
            &invocation("run_project", &[("project_id", &project_id)]),
        )
        .await;
        let cycles = summary["cycles_completed"].as_u64().unwrap();
        assert!((1..=6).contains(&cycles));

        let listing = body(&handler, &invocation("list_projects", &[])).await;
        assert_eq!(listing["count"], 1);
        assert_eq!(listing["projects"][0]["status"], "complete");
    }
}
