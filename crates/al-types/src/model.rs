use serde::{Deserialize, Serialize};

/// Sequence regions that mutations can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Cdr1,
    Cdr2,
    Cdr3,
    Framework,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cdr1 => write!(f, "CDR1"),
            Self::Cdr2 => write!(f, "CDR2"),
            Self::Cdr3 => write!(f, "CDR3"),
            Self::Framework => write!(f, "framework"),
        }
    }
}

/// Kernel-like hyperparameters carried for reporting. These are sampled with
/// small jitter around fixed centers, not fit by any optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub length_scale: f64,
    pub signal_variance: f64,
    pub noise_variance: f64,
}

/// Per-region importance weights attributed to observed improvements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionImportance {
    pub cdr1: f64,
    pub cdr2: f64,
    pub cdr3: f64,
    pub framework: f64,
}

impl Default for RegionImportance {
    fn default() -> Self {
        Self {
            cdr1: 0.35,
            cdr2: 0.15,
            cdr3: 0.40,
            framework: 0.10,
        }
    }
}

impl RegionImportance {
    pub fn weight(&self, region: Region) -> f64 {
        match region {
            Region::Cdr1 => self.cdr1,
            Region::Cdr2 => self.cdr2,
            Region::Cdr3 => self.cdr3,
            Region::Framework => self.framework,
        }
    }
}

/// Breakdown of training observations consumed by the surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainingPoints {
    pub total: usize,
    pub current_cycle: usize,
    pub historical: usize,
}

/// A value-object snapshot of the surrogate model after one update.
///
/// Produced fresh each cycle from the updater; the previous snapshot plus new
/// observations are its only inputs. Never persisted as a live object, only
/// as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub cycle: u32,
    pub training_points: TrainingPoints,
    /// Cross-validated R² stand-in, bounded in [base, base + max bonus].
    pub accuracy_r2: f64,
    /// RMSE on log KD, shrinking with cycle count.
    pub rmse_log_kd: f64,
    /// Predictive uncertainty; non-increasing with cycle count down to a floor.
    pub uncertainty: f64,
    pub hyperparameters: Hyperparameters,
    pub region_importance: RegionImportance,
}

impl ModelSnapshot {
    pub fn model_version(&self) -> String {
        format!("GP_v{}", self.cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_importance_defaults_sum_to_one() {
        let ri = RegionImportance::default();
        let sum = ri.cdr1 + ri.cdr2 + ri.cdr3 + ri.framework;
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(ri.weight(Region::Cdr3), 0.40);
    }

    #[test]
    fn model_version_format() {
        let snapshot = ModelSnapshot {
            cycle: 3,
            training_points: TrainingPoints::default(),
            accuracy_r2: 0.78,
            rmse_log_kd: 0.24,
            uncertainty: 0.25,
            hyperparameters: Hyperparameters {
                length_scale: 1.2,
                signal_variance: 0.8,
                noise_variance: 0.12,
            },
            region_importance: RegionImportance::default(),
        };
        assert_eq!(snapshot.model_version(), "GP_v3");
    }
}
