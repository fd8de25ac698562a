//! Termination policy: the continue/stop decision evaluated once per
//! completed cycle.

use serde::{Deserialize, Serialize};

use al_types::{AcquisitionFunction, ModelSnapshot, Region};

/// Thresholds for the stop ladder and next-cycle recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Below this uncertainty the model is considered converged.
    pub convergence_floor: f64,
    /// Hard budget on cycles per project.
    pub max_cycles: u32,
    /// Above this uncertainty the next cycle explores (UCB).
    pub exploration_uncertainty: f64,
    /// Above this target-progress percentage the next cycle exploits.
    pub exploitation_progress: f64,
    /// Above this uncertainty the next batch is the large one.
    pub large_batch_uncertainty: f64,
    pub large_batch: usize,
    pub small_batch: usize,
    /// CDR3 importance weight above which focus narrows to CDR1/CDR3.
    pub focus_weight_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            convergence_floor: 0.15,
            max_cycles: 6,
            exploration_uncertainty: 0.25,
            exploitation_progress: 80.0,
            large_batch_uncertainty: 0.2,
            large_batch: 8,
            small_batch: 6,
            focus_weight_threshold: 0.3,
        }
    }
}

/// Recommendation accompanying a `Continue` decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextCyclePlan {
    pub acquisition_function: AcquisitionFunction,
    pub strategy_label: String,
    pub batch_size: usize,
    pub focus_regions: Vec<Region>,
    pub estimated_cycles_remaining: u32,
}

/// Outcome of one policy evaluation. Stop decisions are absorbing: once a
/// project stops, the policy must not be consulted for it again in the same
/// run. Re-invocation is the caller's error, not the policy's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Continue(NextCyclePlan),
    StopTargetMet,
    StopConverged,
    StopBudgetExhausted,
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, Decision::Continue(_))
    }

    /// Human-readable termination reason, if stopped.
    pub fn termination_reason(&self) -> Option<&'static str> {
        match self {
            Decision::Continue(_) => None,
            Decision::StopTargetMet => Some("Target achieved"),
            Decision::StopConverged => Some("Converged"),
            Decision::StopBudgetExhausted => Some("Cycle budget exhausted"),
        }
    }
}

/// Pure decision procedure over current progress, model uncertainty and the
/// cycle budget.
#[derive(Debug, Clone, Default)]
pub struct TerminationPolicy {
    config: PolicyConfig,
}

impl TerminationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        best_kd_nm: f64,
        target_kd_nm: f64,
        snapshot: &ModelSnapshot,
        cycles_completed: u32,
    ) -> Decision {
        let cfg = &self.config;

        if best_kd_nm <= target_kd_nm {
            return Decision::StopTargetMet;
        }
        if snapshot.uncertainty < cfg.convergence_floor {
            return Decision::StopConverged;
        }
        if cycles_completed >= cfg.max_cycles {
            return Decision::StopBudgetExhausted;
        }

        let target_progress = if best_kd_nm > 0.0 {
            (target_kd_nm / best_kd_nm * 100.0).min(100.0)
        } else {
            0.0
        };

        let (acquisition_function, strategy_label) =
            if snapshot.uncertainty > cfg.exploration_uncertainty {
                (
                    AcquisitionFunction::Ucb,
                    "Exploration-focused (UCB with high beta)",
                )
            } else if target_progress > cfg.exploitation_progress {
                (
                    AcquisitionFunction::ExpectedImprovement,
                    "Exploitation-focused (EI with low xi)",
                )
            } else {
                (
                    AcquisitionFunction::ExpectedImprovement,
                    "Balanced exploration-exploitation (EI)",
                )
            };

        let batch_size = if snapshot.uncertainty > cfg.large_batch_uncertainty {
            cfg.large_batch
        } else {
            cfg.small_batch
        };

        let focus_regions = if snapshot.region_importance.cdr3 > cfg.focus_weight_threshold {
            vec![Region::Cdr1, Region::Cdr3]
        } else {
            vec![Region::Cdr1, Region::Cdr2, Region::Cdr3]
        };

        Decision::Continue(NextCyclePlan {
            acquisition_function,
            strategy_label: strategy_label.to_string(),
            batch_size,
            focus_regions,
            estimated_cycles_remaining: 3u32.saturating_sub(cycles_completed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use al_types::{Hyperparameters, RegionImportance, TrainingPoints};

    fn snapshot(uncertainty: f64) -> ModelSnapshot {
        ModelSnapshot {
            cycle: 2,
            training_points: TrainingPoints::default(),
            accuracy_r2: 0.79,
            rmse_log_kd: 0.26,
            uncertainty,
            hyperparameters: Hyperparameters {
                length_scale: 1.2,
                signal_variance: 0.8,
                noise_variance: 0.13,
            },
            region_importance: RegionImportance::default(),
        }
    }

    #[test]
    fn target_met_stops() {
        let policy = TerminationPolicy::new();
        let decision = policy.evaluate(0.8, 1.0, &snapshot(0.3), 2);
        assert_eq!(decision, Decision::StopTargetMet);
        assert_eq!(decision.termination_reason(), Some("Target achieved"));
    }

    #[test]
    fn low_uncertainty_converges() {
        let policy = TerminationPolicy::new();
        let decision = policy.evaluate(2.0, 1.0, &snapshot(0.05), 2);
        assert_eq!(decision, Decision::StopConverged);
    }

    #[test]
    fn budget_exhausted_at_six_cycles() {
        let policy = TerminationPolicy::new();
        let decision = policy.evaluate(2.0, 1.0, &snapshot(0.3), 6);
        assert_eq!(decision, Decision::StopBudgetExhausted);
    }

    #[test]
    fn high_uncertainty_continues_with_ucb() {
        let policy = TerminationPolicy::new();
        match policy.evaluate(2.0, 1.0, &snapshot(0.3), 2) {
            Decision::Continue(plan) => {
                assert_eq!(plan.acquisition_function, AcquisitionFunction::Ucb);
                assert_eq!(plan.batch_size, 8);
                assert_eq!(plan.estimated_cycles_remaining, 1);
            }
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[test]
    fn near_target_continues_with_exploitation_ei() {
        let policy = TerminationPolicy::new();
        // progress = 1.0/1.1 * 100 ≈ 90.9% > 80, uncertainty below 0.25
        match policy.evaluate(1.1, 1.0, &snapshot(0.18), 2) {
            Decision::Continue(plan) => {
                assert_eq!(
                    plan.acquisition_function,
                    AcquisitionFunction::ExpectedImprovement
                );
                assert!(plan.strategy_label.contains("Exploitation"));
                assert_eq!(plan.batch_size, 6);
            }
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[test]
    fn mid_progress_continues_balanced() {
        let policy = TerminationPolicy::new();
        match policy.evaluate(2.0, 1.0, &snapshot(0.22), 2) {
            Decision::Continue(plan) => {
                assert!(plan.strategy_label.contains("Balanced"));
                assert_eq!(plan.batch_size, 8); // 0.22 > 0.2
            }
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[test]
    fn focus_narrows_when_cdr3_dominates() {
        let policy = TerminationPolicy::new();
        // Default importance has cdr3 = 0.40 > 0.3
        match policy.evaluate(2.0, 1.0, &snapshot(0.3), 2) {
            Decision::Continue(plan) => {
                assert_eq!(plan.focus_regions, vec![Region::Cdr1, Region::Cdr3]);
            }
            other => panic!("expected Continue, got {other:?}"),
        }

        let mut snap = snapshot(0.3);
        snap.region_importance = RegionImportance {
            cdr1: 0.30,
            cdr2: 0.25,
            cdr3: 0.25,
            framework: 0.20,
        };
        match policy.evaluate(2.0, 1.0, &snap, 2) {
            Decision::Continue(plan) => {
                assert_eq!(
                    plan.focus_regions,
                    vec![Region::Cdr1, Region::Cdr2, Region::Cdr3]
                );
            }
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[test]
    fn stop_ladder_order_target_before_convergence() {
        // Both target-met and converged: target wins
        let policy = TerminationPolicy::new();
        let decision = policy.evaluate(0.5, 1.0, &snapshot(0.05), 6);
        assert_eq!(decision, Decision::StopTargetMet);
    }
}
