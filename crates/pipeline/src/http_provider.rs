//! HTTP client for an OpenAI-compatible embeddings endpoint.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use scenegate_core::similarity::{validate_dimension, ContentVector};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::embedding::{EmbeddingProvider, ProviderError};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response body of `POST /v1/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Rate-limited embedding client.
///
/// Every request waits on a shared token bucket before it is sent, and the
/// underlying client enforces a per-request timeout.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    rate_limiter: DefaultDirectRateLimiter,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &PipelineConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.embedding_timeout)
            .build()?;
        let per_second = NonZeroU32::new(config.embedding_rate_per_sec).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_url: config.embedding_api_url.clone(),
            api_key,
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// Send one request for `inputs` and return vectors in input order.
    async fn request(&self, inputs: Vec<&str>) -> Result<Vec<ContentVector>, ProviderError> {
        let expected = inputs.len();
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let response = Self::ensure_success(response).await?;
        let mut body: EmbeddingResponse = response.json().await.map_err(Self::map_request_error)?;

        if body.data.len() != expected {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {expected} embeddings, got {}",
                body.data.len()
            )));
        }
        body.data.sort_by_key(|d| d.index);

        body.data
            .into_iter()
            .map(|d| {
                let vector = ContentVector::new(d.embedding)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                validate_dimension(&vector, self.dimension)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                Ok(vector)
            })
            .collect()
    }

    fn map_request_error(err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Unavailable(err.to_string())
        } else {
            ProviderError::Request(err)
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn generate_embedding(&self, text: &str) -> Result<ContentVector, ProviderError> {
        let mut vectors = self.request(vec![text]).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("empty embedding list".to_string()))
    }

    /// One request for the whole batch. A failed request fails every key.
    async fn generate_embeddings(
        &self,
        batch: &BTreeMap<String, String>,
    ) -> BTreeMap<String, Result<ContentVector, ProviderError>> {
        if batch.is_empty() {
            return BTreeMap::new();
        }

        let inputs: Vec<&str> = batch.values().map(String::as_str).collect();
        match self.request(inputs).await {
            Ok(vectors) => batch.keys().cloned().zip(vectors.into_iter().map(Ok)).collect(),
            Err(err) => fail_batch(batch, &err),
        }
    }
}

/// Report the same failure for every key of a batch.
fn fail_batch(
    batch: &BTreeMap<String, String>,
    err: &ProviderError,
) -> BTreeMap<String, Result<ContentVector, ProviderError>> {
    batch.keys().map(|k| (k.clone(), Err(err.replicate()))).collect()
}
