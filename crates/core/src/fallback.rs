//! Deterministic stand-in vectors for when the embedding provider is down.
//!
//! The vector is seeded from the SHA-256 of the text, so the same text always
//! maps to the same unit vector within a build. These vectors carry no
//! semantic meaning; results built from them must be flagged as degraded.

use std::num::NonZeroUsize;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::similarity::ContentVector;

/// Generate a unit-norm pseudo-random vector seeded by `text`.
pub fn fallback_vector(text: &str, dimension: NonZeroUsize) -> ContentVector {
    let seed: [u8; 32] = Sha256::digest(text.as_bytes()).into();
    let mut rng = StdRng::from_seed(seed);

    let mut values: Vec<f32> = (0..dimension.get())
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect();

    let norm = values
        .iter()
        .map(|v| (*v as f64) * (*v as f64))
        .sum::<f64>()
        .sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v = (*v as f64 / norm) as f32;
        }
    } else {
        values[0] = 1.0;
    }

    ContentVector::from_trusted(values)
}
