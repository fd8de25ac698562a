//! Gaussian perturbation helper shared by the synthesizer and automation.

use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Draw one sample from N(0, sigma). Non-positive sigma yields 0.
pub(crate) fn gauss<R: Rng>(rng: &mut R, sigma: f64) -> f64 {
    Normal::new(0.0, sigma)
        .map(|dist| dist.sample(rng))
        .unwrap_or(0.0)
}
