//! Embedding with graceful degradation.
//!
//! [`ResilientEmbedder`] never fails: when the provider errors for a text,
//! the text is embedded with the deterministic fallback vector instead and
//! the substitution is logged and counted.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scenegate_core::fallback::fallback_vector;
use scenegate_core::grid::{GridBlockKey, SceneDescriptor, SceneLayout};
use scenegate_core::similarity::ContentVector;

use crate::config::{PipelineConfig, MAX_BLOCK_CONCURRENCY};
use crate::embedding::{EmbeddingProvider, ProviderError};

/// Where a vector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    Provider,
    Fallback,
}

/// A vector that is always usable, tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vector: ContentVector,
    pub source: EmbeddingSource,
}

/// An embedded scene plus how many of its cells needed the fallback.
#[derive(Debug, Clone)]
pub struct EmbeddedScene {
    pub descriptor: SceneDescriptor,
    pub fallback_blocks: usize,
}

#[derive(Clone)]
pub struct ResilientEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: NonZeroUsize,
    block_concurrency: usize,
}

impl ResilientEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            dimension: NonZeroUsize::new(config.embedding_dimension).unwrap_or(NonZeroUsize::MIN),
            block_concurrency: config.block_concurrency.clamp(1, MAX_BLOCK_CONCURRENCY),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension.get()
    }

    /// Embed one text, substituting the fallback on any provider error.
    pub async fn embed(&self, text: &str) -> Embedded {
        match self.provider.generate_embedding(text).await {
            Ok(vector) => Embedded {
                vector,
                source: EmbeddingSource::Provider,
            },
            Err(err) => self.fallback(text, &err),
        }
    }

    /// Embed a keyed batch through the provider's batch call.
    pub async fn embed_batch(&self, batch: &BTreeMap<String, String>) -> BTreeMap<String, Embedded> {
        let mut results = self.provider.generate_embeddings(batch).await;
        batch
            .iter()
            .map(|(key, text)| {
                let embedded = match results.remove(key) {
                    Some(Ok(vector)) => Embedded {
                        vector,
                        source: EmbeddingSource::Provider,
                    },
                    Some(Err(err)) => self.fallback(text, &err),
                    None => self.fallback(
                        text,
                        &ProviderError::InvalidResponse(format!("no embedding for key {key}")),
                    ),
                };
                (key.clone(), embedded)
            })
            .collect()
    }

    /// Embed every cell of a layout with at most `block_concurrency`
    /// provider calls in flight.
    pub async fn embed_layout(&self, layout: &SceneLayout) -> EmbeddedScene {
        let cells: Vec<(GridBlockKey, String)> = layout
            .blocks()
            .iter()
            .map(|(k, t)| (*k, t.clone()))
            .collect();

        let embedded: Vec<(GridBlockKey, Embedded)> = stream::iter(cells)
            .map(|(key, text)| async move { (key, self.embed(&text).await) })
            .buffer_unordered(self.block_concurrency)
            .collect()
            .await;

        let fallback_blocks = embedded
            .iter()
            .filter(|(_, e)| e.source == EmbeddingSource::Fallback)
            .count();
        let descriptor = embedded.into_iter().map(|(k, e)| (k, e.vector)).collect();

        EmbeddedScene {
            descriptor,
            fallback_blocks,
        }
    }

    fn fallback(&self, text: &str, err: &ProviderError) -> Embedded {
        tracing::warn!(error = %err, text_len = text.len(), "Embedding provider failed, using fallback vector");
        Embedded {
            vector: fallback_vector(text, self.dimension),
            source: EmbeddingSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Fails for any text containing "fail", otherwise returns a fixed vector.
    struct FlakyProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn generate_embedding(&self, text: &str) -> Result<ContentVector, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("fail") {
                Err(ProviderError::Timeout)
            } else {
                ContentVector::new(vec![1.0, 0.0, 0.0, 0.0])
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
            }
        }
    }

    fn embedder() -> (ResilientEmbedder, Arc<FlakyProvider>) {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        });
        let config = PipelineConfig {
            embedding_dimension: 4,
            ..PipelineConfig::default()
        };
        (ResilientEmbedder::new(provider.clone(), &config), provider)
    }

    #[tokio::test]
    async fn provider_vector_is_used_when_available() {
        let (embedder, _) = embedder();
        let e = embedder.embed("presenter").await;
        assert_eq!(e.source, EmbeddingSource::Provider);
    }

    #[tokio::test]
    async fn failure_yields_reproducible_fallback() {
        let (embedder, _) = embedder();
        let a = embedder.embed("fail here").await;
        let b = embedder.embed("fail here").await;
        assert_eq!(a.source, EmbeddingSource::Fallback);
        assert_eq!(a.vector, b.vector);
        assert_eq!(a.vector.dimension(), 4);
    }

    #[tokio::test]
    async fn layout_embeds_every_cell_and_counts_fallbacks() {
        let (embedder, provider) = embedder();
        let mut blocks = SceneLayout::uniform("desk").blocks().clone();
        blocks.insert(GridBlockKey::ALL[4], "fail centre".to_string());

        let scene = embedder.embed_layout(&SceneLayout::new(blocks)).await;
        assert_eq!(scene.descriptor.len(), 9);
        assert_eq!(scene.fallback_blocks, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn batch_falls_back_per_key() {
        let (embedder, _) = embedder();
        let batch: BTreeMap<String, String> = [
            ("a".to_string(), "ok".to_string()),
            ("b".to_string(), "fail".to_string()),
        ]
        .into_iter()
        .collect();

        let out = embedder.embed_batch(&batch).await;
        assert_eq!(out["a"].source, EmbeddingSource::Provider);
        assert_eq!(out["b"].source, EmbeddingSource::Fallback);
    }
}
