//! Candidate variant generation.

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use al_types::numeric::round_to;
use al_types::{
    AcquisitionFunction, AlResult, DesignError, ModelSnapshot, Mutation, Variant,
};

use crate::acquisition;
use crate::noise::gauss;

/// Mutation-site pool and residue alphabet for candidate generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Permissible mutation positions (CDR loop residues).
    pub mutation_sites: Vec<u32>,
    /// Permissible substitution residues.
    pub alphabet: Vec<char>,
    /// Distinct sites mutated per candidate.
    pub mutations_per_variant: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mutation_sites: vec![48, 50, 52, 99, 101, 103],
            alphabet: vec!['A', 'V', 'L', 'I', 'F', 'Y', 'W', 'S', 'T', 'N', 'Q'],
            mutations_per_variant: 2,
        }
    }
}

impl GeneratorConfig {
    /// Residue occupying `position` in the parent scaffold: alanine in the
    /// CDR1/CDR2 stretch, serine in the CDR3 stretch.
    fn parent_residue(&self, position: u32) -> char {
        if position < 60 {
            'A'
        } else {
            'S'
        }
    }
}

/// Proposes a batch of candidate variants ranked by acquisition score.
#[derive(Debug, Clone, Default)]
pub struct CandidateGenerator {
    config: GeneratorConfig,
}

impl CandidateGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Propose `batch_size` candidates mutated from `parent_sequence`,
    /// returned in descending acquisition-score order (stable on ties).
    pub fn propose(
        &self,
        parent_sequence: &str,
        cycle_number: u32,
        acquisition_function: AcquisitionFunction,
        batch_size: usize,
        snapshot: &ModelSnapshot,
    ) -> AlResult<Vec<Variant>> {
        self.propose_with_rng(
            &mut rand::rng(),
            parent_sequence,
            cycle_number,
            acquisition_function,
            batch_size,
            snapshot,
        )
    }

    pub fn propose_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        parent_sequence: &str,
        cycle_number: u32,
        acquisition_function: AcquisitionFunction,
        batch_size: usize,
        snapshot: &ModelSnapshot,
    ) -> AlResult<Vec<Variant>> {
        if batch_size == 0 {
            return Err(DesignError::InvalidBatchSize { requested: 0 }.into());
        }
        if self.config.mutation_sites.len() < self.config.mutations_per_variant.max(2) {
            return Err(DesignError::MutationPoolTooSmall {
                available: self.config.mutation_sites.len(),
            }
            .into());
        }

        let mut variants = Vec::with_capacity(batch_size);
        for index in 0..batch_size {
            let mutations = self.draw_mutations(rng)?;

            // Rank prior: earlier-drafted candidates are seeded as nominally
            // better, with bounded perturbation on top.
            let predicted_affinity_nm =
                round_to(2.5 - index as f64 * 0.15 + gauss(rng, 0.1), 2);
            let acquisition_score = round_to(
                acquisition::score(acquisition_function, index, snapshot.uncertainty, rng),
                3,
            );

            variants.push(Variant {
                variant_id: Variant::variant_id_for(cycle_number, index),
                cycle_number,
                sequence: format!("{parent_sequence}_C{cycle_number}V{}", index + 1),
                mutations,
                predicted_affinity_nm,
                acquisition_score,
                acquisition_function,
                observation: None,
                created_at: Utc::now(),
            });
        }

        // Stable descending sort: ties keep generation order.
        variants.sort_by(|a, b| {
            b.acquisition_score
                .partial_cmp(&a.acquisition_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            cycle = cycle_number,
            batch = batch_size,
            function = %acquisition_function,
            "proposed candidate batch"
        );
        Ok(variants)
    }

    fn draw_mutations<R: Rng>(&self, rng: &mut R) -> AlResult<Vec<Mutation>> {
        let sites: Vec<u32> = self
            .config
            .mutation_sites
            .choose_multiple(rng, self.config.mutations_per_variant)
            .copied()
            .collect();

        let mut mutations = Vec::with_capacity(sites.len());
        for position in sites {
            let original = self.config.parent_residue(position);
            let options: Vec<char> = self
                .config
                .alphabet
                .iter()
                .copied()
                .filter(|&aa| aa != original)
                .collect();
            let replacement = *options
                .choose(rng)
                .ok_or(DesignError::EmptyAlphabet { position })?;
            mutations.push(Mutation {
                position,
                original,
                replacement,
            });
        }
        Ok(mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use al_types::{Hyperparameters, RegionImportance, TrainingPoints};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn snapshot(uncertainty: f64) -> ModelSnapshot {
        ModelSnapshot {
            cycle: 1,
            training_points: TrainingPoints::default(),
            accuracy_r2: 0.77,
            rmse_log_kd: 0.28,
            uncertainty,
            hyperparameters: Hyperparameters {
                length_scale: 1.2,
                signal_variance: 0.8,
                noise_variance: 0.14,
            },
            region_importance: RegionImportance::default(),
        }
    }

    #[test]
    fn batch_has_exact_count_and_two_distinct_mutations() {
        let generator = CandidateGenerator::new();
        let mut rng = SmallRng::seed_from_u64(5);
        let pool = GeneratorConfig::default().mutation_sites;

        for batch_size in [1, 4, 8, 16] {
            let batch = generator
                .propose_with_rng(
                    &mut rng,
                    "PARENT",
                    1,
                    AcquisitionFunction::ExpectedImprovement,
                    batch_size,
                    &snapshot(0.3),
                )
                .unwrap();
            assert_eq!(batch.len(), batch_size);

            for v in &batch {
                assert_eq!(v.mutations.len(), 2);
                assert_ne!(v.mutations[0].position, v.mutations[1].position);
                for m in &v.mutations {
                    assert!(pool.contains(&m.position));
                    assert_ne!(m.original, m.replacement);
                }
            }
        }
    }

    #[test]
    fn batch_sorted_descending_by_acquisition() {
        let generator = CandidateGenerator::new();
        let mut rng = SmallRng::seed_from_u64(17);
        let batch = generator
            .propose_with_rng(
                &mut rng,
                "PARENT",
                2,
                AcquisitionFunction::Ucb,
                8,
                &snapshot(0.3),
            )
            .unwrap();
        for pair in batch.windows(2) {
            assert!(pair[0].acquisition_score >= pair[1].acquisition_score);
        }
    }

    #[test]
    fn zero_batch_is_invalid_input() {
        let generator = CandidateGenerator::new();
        let err = generator
            .propose(
                "PARENT",
                1,
                AcquisitionFunction::ExpectedImprovement,
                0,
                &snapshot(0.3),
            )
            .unwrap_err();
        assert!(err.to_string().contains("Invalid batch size"));
    }

    #[test]
    fn tiny_site_pool_is_invalid_input() {
        let generator = CandidateGenerator::with_config(GeneratorConfig {
            mutation_sites: vec![48],
            ..GeneratorConfig::default()
        });
        let err = generator
            .propose(
                "PARENT",
                1,
                AcquisitionFunction::ExpectedImprovement,
                4,
                &snapshot(0.3),
            )
            .unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn variant_ids_and_sequences_follow_cycle() {
        let generator = CandidateGenerator::new();
        let mut rng = SmallRng::seed_from_u64(23);
        let batch = generator
            .propose_with_rng(
                &mut rng,
                "QVQL",
                3,
                AcquisitionFunction::ExpectedImprovement,
                2,
                &snapshot(0.2),
            )
            .unwrap();

        let mut ids: Vec<&str> = batch.iter().map(|v| v.variant_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["VAR_3_01", "VAR_3_02"]);
        for v in &batch {
            assert!(v.sequence.starts_with("QVQL_C3V"));
        }
    }

    #[test]
    fn replacement_excludes_parent_residue() {
        let generator = CandidateGenerator::new();
        let mut rng = SmallRng::seed_from_u64(31);
        for _ in 0..50 {
            let batch = generator
                .propose_with_rng(
                    &mut rng,
                    "PARENT",
                    1,
                    AcquisitionFunction::ExpectedImprovement,
                    8,
                    &snapshot(0.3),
                )
                .unwrap();
            for v in &batch {
                for m in &v.mutations {
                    let expected_original = if m.position < 60 { 'A' } else { 'S' };
                    assert_eq!(m.original, expected_original);
                }
            }
        }
    }
}
