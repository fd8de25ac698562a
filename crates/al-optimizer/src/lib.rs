//! # al-optimizer
//!
//! Surrogate model updates, acquisition scoring, candidate generation and the
//! termination policy for AffinityLoop.
//!
//! The surrogate is a deterministic heuristic stand-in for a Gaussian process:
//! accuracy and uncertainty follow the cycle count and observation volume,
//! while kernel hyperparameters carry small reporting jitter. Candidate
//! batches are ranked by Expected Improvement or UCB before assay.

mod acquisition;
mod generator;
mod noise;
mod policy;
mod surrogate;

pub use acquisition::{score, EI_EXPLORATION_WEIGHT, SCORE_FLOOR, UCB_Z_MULTIPLIER};
pub use generator::{CandidateGenerator, GeneratorConfig};
pub use policy::{Decision, NextCyclePlan, PolicyConfig, TerminationPolicy};
pub use surrogate::{SurrogateConfig, SurrogateUpdater};
