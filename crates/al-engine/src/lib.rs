//! # al-engine
//!
//! Campaign orchestration for AffinityLoop: the project planner, the DMTA
//! cycle engine (design, make/test, analyze, decide), read-side status
//! reporting, and the invocation boundary used by the conversational
//! front-end.

mod engine;
mod envelope;
mod handler;
mod planner;
mod status;

pub use engine::{DmtaEngine, MakeTestOutcome, ProjectRunSummary};
pub use envelope::{DegradedInput, Invocation, Parameter, ResponseEnvelope};
pub use handler::InvocationHandler;
pub use planner::{precedent_catalog, PlanOptions, Precedent, ProjectPlanner};
pub use status::{CycleProgress, ProjectProgress, StatusService};
