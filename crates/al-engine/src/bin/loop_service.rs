use std::sync::Arc;

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use al_engine::{Invocation, InvocationHandler, Parameter};
use al_store::{FileObjectStore, MemoryStore};

fn param(name: &str, value: &str) -> Parameter {
    Parameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}

async fn invoke(
    handler: &InvocationHandler,
    function: &str,
    parameters: Vec<Parameter>,
) -> anyhow::Result<Value> {
    let invocation = Invocation {
        action_group: "affinity-loop".to_string(),
        function: function.to_string(),
        parameters,
    };
    let response = handler.handle(&invocation).await?;
    Ok(serde_json::from_str(&response.body)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir =
        std::env::var("AFFINITYLOOP_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let store = Arc::new(MemoryStore::new());
    let objects = Arc::new(FileObjectStore::new(&data_dir));
    let handler = InvocationHandler::new(store, objects);

    let planned = invoke(
        &handler,
        "plan_project",
        vec![
            param("target_molecule", "Cablivi"),
            param(
                "objective",
                "Improve vWF-A1 binding affinity to sub-nanomolar KD",
            ),
        ],
    )
    .await?;
    let project_id = planned["project_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    println!(
        "Planned project {project_id} (plan: {data_dir}/{})",
        planned["plan_key"].as_str().unwrap_or_default()
    );

    let summary = invoke(
        &handler,
        "run_project",
        vec![param("project_id", &project_id)],
    )
    .await?;
    println!(
        "Campaign finished after {} cycle(s): best KD {} nM",
        summary["cycles_completed"], summary["best_kd_nm"],
    );

    let progress = invoke(
        &handler,
        "project_status",
        vec![param("project_id", &project_id)],
    )
    .await?;
    if let Some(cycles) = progress["cycles"].as_array() {
        for cycle in cycles {
            println!(
                "  cycle {}: stage {}, best KD {} nM",
                cycle["cycle_number"], cycle["stage"], cycle["best_kd_nm"],
            );
        }
    }
    println!(
        "Current phase: {}",
        progress["current_phase"].as_str().unwrap_or_default()
    );

    Ok(())
}
