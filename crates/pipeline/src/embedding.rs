//! Embedding provider interface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use scenegate_core::similarity::ContentVector;

/// Errors from an embedding provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No provider is configured, or it cannot be reached.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with a non-2xx status.
    #[error("Embedding provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Embedding request timed out")]
    Timeout,

    /// The response parsed but did not contain a usable vector.
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ProviderError {
    /// Copy this error for another key of the same failed batch.
    ///
    /// `reqwest::Error` is not `Clone`, so a transport failure is carried
    /// over as its message.
    pub fn replicate(&self) -> Self {
        match self {
            Self::Unavailable(msg) => Self::Unavailable(msg.clone()),
            Self::Provider { status, body } => Self::Provider {
                status: *status,
                body: body.clone(),
            },
            Self::Timeout => Self::Timeout,
            Self::InvalidResponse(msg) => Self::InvalidResponse(msg.clone()),
            Self::Request(err) => Self::Unavailable(format!("HTTP request failed: {err}")),
        }
    }
}

/// Converts text into content vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<ContentVector, ProviderError>;

    /// Embed a keyed batch. Each key succeeds or fails on its own.
    async fn generate_embeddings(
        &self,
        batch: &BTreeMap<String, String>,
    ) -> BTreeMap<String, Result<ContentVector, ProviderError>> {
        let mut out = BTreeMap::new();
        for (key, text) in batch {
            out.insert(key.clone(), self.generate_embedding(text).await);
        }
        out
    }
}

/// A provider that always reports itself unavailable.
///
/// Used when no API key is configured.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    async fn generate_embedding(&self, _text: &str) -> Result<ContentVector, ProviderError> {
        Err(ProviderError::Unavailable(
            "no embedding API key configured".to_string(),
        ))
    }
}
