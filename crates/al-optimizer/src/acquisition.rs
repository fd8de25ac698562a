//! Acquisition scoring: Expected Improvement and Upper Confidence Bound.
//!
//! Both scores decay with the candidate's generation index (an intentional
//! rank prior: earlier-drafted candidates are seeded as nominally better) and
//! are lifted by the surrogate's current uncertainty, so a less certain model
//! spreads the batch toward exploration.

use rand::Rng;

use al_types::AcquisitionFunction;

use crate::noise::gauss;

/// Weight applied to uncertainty in the EI score.
pub const EI_EXPLORATION_WEIGHT: f64 = 0.3;
/// One-sided ~95% bound multiplier for UCB.
pub const UCB_Z_MULTIPLIER: f64 = 1.96;
/// Scores never fall below this floor.
pub const SCORE_FLOOR: f64 = 0.1;

/// Score candidate `index` (0-based, generation order) under `function`.
pub fn score<R: Rng>(
    function: AcquisitionFunction,
    index: usize,
    uncertainty: f64,
    rng: &mut R,
) -> f64 {
    match function {
        AcquisitionFunction::ExpectedImprovement => expected_improvement(index, uncertainty, rng),
        AcquisitionFunction::Ucb => upper_confidence_bound(index, uncertainty, rng),
    }
}

fn expected_improvement<R: Rng>(index: usize, uncertainty: f64, rng: &mut R) -> f64 {
    let base = 0.9 - index as f64 * 0.08;
    let exploration_bonus = uncertainty * EI_EXPLORATION_WEIGHT;
    (base + exploration_bonus + gauss(rng, 0.05)).max(SCORE_FLOOR)
}

fn upper_confidence_bound<R: Rng>(index: usize, uncertainty: f64, rng: &mut R) -> f64 {
    let mean_prediction = 0.8 - index as f64 * 0.06;
    let confidence_interval = uncertainty * UCB_Z_MULTIPLIER;
    (mean_prediction + confidence_interval + gauss(rng, 0.03)).max(SCORE_FLOOR)
}
