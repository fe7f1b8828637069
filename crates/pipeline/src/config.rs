//! Pipeline configuration.

use std::str::FromStr;
use std::time::Duration;

use scenegate_core::aggregate::DEFAULT_FALLBACK_SCORE;
use scenegate_core::similarity::DEFAULT_EMBEDDING_DIMENSION;

/// Upper bound on concurrent block embeddings per scene (one per grid cell).
pub const MAX_BLOCK_CONCURRENCY: usize = 9;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Embedding provider and scoring settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// OpenAI-compatible embeddings endpoint.
    pub embedding_api_url: String,
    /// `None` disables the provider; every vector comes from the fallback.
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_timeout: Duration,
    pub embedding_rate_per_sec: u32,
    /// Concurrent block embeddings per scene, within `1..=9`.
    pub block_concurrency: usize,
    /// Score used by low-confidence results.
    pub fallback_score: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            embedding_api_url: "https://api.openai.com/v1/embeddings".to_string(),
            embedding_api_key: None,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            embedding_timeout: Duration::from_secs(10),
            embedding_rate_per_sec: 20,
            block_concurrency: MAX_BLOCK_CONCURRENCY,
            fallback_score: DEFAULT_FALLBACK_SCORE,
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                  |
    /// |--------------------------|------------------------------------------|
    /// | `EMBEDDING_API_URL`      | `https://api.openai.com/v1/embeddings`   |
    /// | `EMBEDDING_API_KEY`      | unset (fallback vectors only)            |
    /// | `EMBEDDING_MODEL`        | `text-embedding-3-small`                 |
    /// | `EMBEDDING_DIMENSION`    | `1536`                                   |
    /// | `EMBEDDING_TIMEOUT_SECS` | `10`                                     |
    /// | `EMBEDDING_RATE_PER_SEC` | `20`                                     |
    /// | `BLOCK_CONCURRENCY`      | `9` (clamped to `1..=9`)                 |
    /// | `FALLBACK_SCORE`         | `0.1`                                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let embedding_api_url =
            std::env::var("EMBEDDING_API_URL").unwrap_or(defaults.embedding_api_url);
        let embedding_api_key = std::env::var("EMBEDDING_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let embedding_model = std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model);

        let embedding_dimension: usize =
            parse_var("EMBEDDING_DIMENSION", defaults.embedding_dimension)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::Invalid {
                var: "EMBEDDING_DIMENSION",
                value: "0".to_string(),
            });
        }

        let timeout_secs: u64 = parse_var("EMBEDDING_TIMEOUT_SECS", 10)?;
        let embedding_rate_per_sec: u32 =
            parse_var("EMBEDDING_RATE_PER_SEC", defaults.embedding_rate_per_sec)?;
        let block_concurrency: usize = parse_var("BLOCK_CONCURRENCY", defaults.block_concurrency)?;

        let fallback_score: f64 = parse_var("FALLBACK_SCORE", defaults.fallback_score)?;
        if !(0.0..=1.0).contains(&fallback_score) {
            return Err(ConfigError::Invalid {
                var: "FALLBACK_SCORE",
                value: fallback_score.to_string(),
            });
        }

        Ok(Self {
            embedding_api_url,
            embedding_api_key,
            embedding_model,
            embedding_dimension,
            embedding_timeout: Duration::from_secs(timeout_secs),
            embedding_rate_per_sec: embedding_rate_per_sec.max(1),
            block_concurrency: block_concurrency.clamp(1, MAX_BLOCK_CONCURRENCY),
            fallback_score,
        })
    }
}
