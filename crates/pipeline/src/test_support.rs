//! Stub providers and stores shared by unit and integration tests.
//!
//! Compiled for this crate's tests and behind the `test-support` feature.

use std::sync::Arc;

use async_trait::async_trait;
use scenegate_core::approval::ApprovalThreshold;
use scenegate_core::grid::SceneLayout;
use scenegate_core::similarity::ContentVector;
use scenegate_db::{AutoApprovalCounter, LayoutOwner, LayoutStore, StoreError, ThresholdStore};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::embedding::{EmbeddingProvider, ProviderError};
use crate::resilient::ResilientEmbedder;

pub const DIM: usize = 4;

/// Maps a few colour words to axis vectors. A leading `-` negates the
/// vector; anything else is reported as a provider failure.
pub struct ColourProvider;

#[async_trait]
impl EmbeddingProvider for ColourProvider {
    async fn generate_embedding(&self, text: &str) -> Result<ContentVector, ProviderError> {
        let (sign, word) = match text.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, text),
        };
        let axis = match word {
            "red" => 0,
            "green" => 1,
            "blue" => 2,
            "white" => 3,
            _ => return Err(ProviderError::Unavailable(format!("unknown word '{word}'"))),
        };
        let mut values = vec![0.0; DIM];
        values[axis] = sign;
        ContentVector::new(values).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

pub fn config() -> PipelineConfig {
    PipelineConfig {
        embedding_dimension: DIM,
        ..PipelineConfig::default()
    }
}

pub fn embedder() -> ResilientEmbedder {
    ResilientEmbedder::new(Arc::new(ColourProvider), &config())
}

pub fn uniform(word: &str) -> SceneLayout {
    SceneLayout::uniform(word)
}

/// A store whose every call fails as if the database were unreachable.
pub struct DownStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::InvalidData("connection refused".to_string()))
}

#[async_trait]
impl ThresholdStore for DownStore {
    async fn find(&self, _: &str, _: Option<&str>) -> Result<Option<ApprovalThreshold>, StoreError> {
        down()
    }

    async fn upsert(&self, _: &ApprovalThreshold) -> Result<ApprovalThreshold, StoreError> {
        down()
    }

    async fn delete(&self, _: Uuid) -> Result<bool, StoreError> {
        down()
    }

    async fn list_for_manager(&self, _: &str) -> Result<Vec<ApprovalThreshold>, StoreError> {
        down()
    }
}

#[async_trait]
impl AutoApprovalCounter for DownStore {
    async fn used(&self, _: &str) -> Result<u32, StoreError> {
        down()
    }

    async fn try_acquire(&self, _: &str, _: u32) -> Result<bool, StoreError> {
        down()
    }

    async fn release(&self, _: &str) -> Result<(), StoreError> {
        down()
    }

    async fn reset(&self, _: &str) -> Result<(), StoreError> {
        down()
    }
}

#[async_trait]
impl LayoutStore for DownStore {
    async fn put_layouts(&self, _: LayoutOwner, _: &str, _: &[SceneLayout]) -> Result<(), StoreError> {
        down()
    }

    async fn get_layouts(&self, _: LayoutOwner, _: &str) -> Result<Option<Vec<SceneLayout>>, StoreError> {
        down()
    }
}
