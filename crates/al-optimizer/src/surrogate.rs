//! Heuristic surrogate-model updater.
//!
//! This is a deliberate stand-in for a fitted regression model: accuracy,
//! RMSE and uncertainty are deterministic functions of the observation count
//! and cycle index, and only the reported hyperparameters carry stochastic
//! jitter. A genuine Gaussian-process backend can replace [`SurrogateUpdater`]
//! as long as it honors the same [`ModelSnapshot`] contract (accuracy bounded
//! in [base, base + max bonus], uncertainty decaying toward a floor).

use rand::Rng;
use serde::{Deserialize, Serialize};

use al_types::numeric::round_to;
use al_types::{Hyperparameters, ModelSnapshot, RegionImportance, TrainingPoints};

use crate::noise::gauss;

/// Constants governing the heuristic model statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateConfig {
    /// Accuracy before any training data arrives.
    pub base_accuracy: f64,
    /// Accuracy gained per usable observation.
    pub points_coefficient: f64,
    /// Cap on the data-driven accuracy bonus.
    pub max_accuracy_bonus: f64,
    /// Uncertainty before the first cycle.
    pub base_uncertainty: f64,
    /// Uncertainty removed per completed cycle.
    pub reduction_rate: f64,
    /// Cap on the total uncertainty reduction.
    pub max_reduction: f64,
    /// Uncertainty never drops below this; prevents false convergence signals.
    pub uncertainty_floor: f64,
    /// RMSE (log KD) at cycle zero and its per-cycle decay.
    pub base_rmse: f64,
    pub rmse_decay: f64,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            base_accuracy: 0.75,
            points_coefficient: 0.01,
            max_accuracy_bonus: 0.15,
            base_uncertainty: 0.4,
            reduction_rate: 0.05,
            max_reduction: 0.25,
            uncertainty_floor: 0.1,
            base_rmse: 0.3,
            rmse_decay: 0.02,
        }
    }
}

/// Refits the surrogate from cumulative observations. Pure apart from the
/// hyperparameter jitter; persisting the snapshot is the caller's concern.
#[derive(Debug, Clone, Default)]
pub struct SurrogateUpdater {
    config: SurrogateConfig,
}

impl SurrogateUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SurrogateConfig) -> Self {
        Self { config }
    }

    /// Produce a fresh [`ModelSnapshot`] from the cumulative usable
    /// observation counts and the cycle index.
    pub fn update(
        &self,
        historical_points: usize,
        current_points: usize,
        cycle_number: u32,
    ) -> ModelSnapshot {
        self.update_with_rng(&mut rand::rng(), historical_points, current_points, cycle_number)
    }

    pub fn update_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        historical_points: usize,
        current_points: usize,
        cycle_number: u32,
    ) -> ModelSnapshot {
        let cfg = &self.config;
        let total_points = historical_points + current_points;
        let cycle = cycle_number as f64;

        let data_bonus = (total_points as f64 * cfg.points_coefficient).min(cfg.max_accuracy_bonus);
        let accuracy_r2 = round_to(cfg.base_accuracy + data_bonus, 3);

        let reduction = (cycle * cfg.reduction_rate).min(cfg.max_reduction);
        let uncertainty = round_to(
            (cfg.base_uncertainty - reduction).max(cfg.uncertainty_floor),
            3,
        );

        let rmse_log_kd = round_to(cfg.base_rmse - cycle * cfg.rmse_decay, 3);

        // Hyperparameters are sampled around fixed centers, not fit.
        let hyperparameters = Hyperparameters {
            length_scale: round_to(1.2 + gauss(rng, 0.1), 2),
            signal_variance: round_to(0.8 + gauss(rng, 0.05), 2),
            noise_variance: round_to((0.15 - cycle * 0.01).max(0.05), 3),
        };

        ModelSnapshot {
            cycle: cycle_number,
            training_points: TrainingPoints {
                total: total_points,
                current_cycle: current_points,
                historical: historical_points,
            },
            accuracy_r2,
            rmse_log_kd,
            uncertainty,
            hyperparameters,
            region_importance: RegionImportance::default(),
        }
    }
}
