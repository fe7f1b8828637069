//! Content vectors and pairwise similarity.
//!
//! Raw cosine similarity lives in `[-1.0, 1.0]`. Everything downstream
//! (grid averaging, thresholds, reports) works on the unit scale `[0.0, 1.0]`
//! produced by [`similarity`], where orthogonal vectors land on `0.5` and
//! opposite vectors on `0.0`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Dimensionality of the default provider model (`text-embedding-3-small`).
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

// ---------------------------------------------------------------------------
// ContentVector
// ---------------------------------------------------------------------------

/// A semantic embedding of one block or scene description.
///
/// Always non-empty with finite components. Deserialization runs the same
/// checks as [`ContentVector::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct ContentVector(Vec<f32>);

impl ContentVector {
    pub fn new(values: Vec<f32>) -> Result<Self, CoreError> {
        if values.is_empty() {
            return Err(CoreError::Validation(
                "Content vector must not be empty".to_string(),
            ));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(CoreError::Validation(format!(
                "Content vector component {pos} is not finite"
            )));
        }
        Ok(Self(values))
    }

    /// Wrap values already known to be non-empty and finite.
    pub(crate) fn from_trusted(values: Vec<f32>) -> Self {
        debug_assert!(!values.is_empty() && values.iter().all(|v| v.is_finite()));
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean norm, computed in `f64`.
    pub fn norm(&self) -> f64 {
        self.0
            .iter()
            .map(|x| (*x as f64) * (*x as f64))
            .sum::<f64>()
            .sqrt()
    }
}

impl TryFrom<Vec<f32>> for ContentVector {
    type Error = CoreError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<ContentVector> for Vec<f32> {
    fn from(v: ContentVector) -> Self {
        v.0
    }
}

/// Validate that a vector has the dimensionality the provider promised.
pub fn validate_dimension(vector: &ContentVector, expected: usize) -> Result<(), CoreError> {
    if vector.dimension() != expected {
        return Err(CoreError::Validation(format!(
            "Embedding must be {expected}-dimensional, got {}",
            vector.dimension()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Raw cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` when either vector has zero magnitude. Fails with
/// [`CoreError::DimensionMismatch`] when the lengths differ.
pub fn cosine_similarity(a: &ContentVector, b: &ContentVector) -> Result<f64, CoreError> {
    if a.dimension() != b.dimension() {
        return Err(CoreError::DimensionMismatch {
            left: a.dimension(),
            right: b.dimension(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    // A single square root keeps `v` against `v` and `-v` exact.
    Ok((dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0))
}

/// Unit-scale similarity in `[0.0, 1.0]`.
///
/// Maps the raw cosine through `(cos + 1) / 2`. A zero vector on either
/// side scores `0.0` rather than the `0.5` the mapping would produce.
pub fn similarity(a: &ContentVector, b: &ContentVector) -> Result<f64, CoreError> {
    if a.dimension() == b.dimension() && (a.norm() == 0.0 || b.norm() == 0.0) {
        return Ok(0.0);
    }
    let cos = cosine_similarity(a, b)?;
    Ok((cos + 1.0) / 2.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
