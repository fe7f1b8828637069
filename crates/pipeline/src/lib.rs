//! Scoring and decision pipeline.
//!
//! Turns scene layouts into embeddings through an external provider (with a
//! deterministic fallback when it fails), compares them with the pure
//! functions in `scenegate-core`, and drives submissions through the
//! approval chain against the stores in `scenegate-db`.

pub mod comparison;
pub mod config;
pub mod embedding;
pub mod error;
pub mod http_provider;
pub mod orchestrator;
pub mod resilient;
pub mod suggestions;
pub mod thresholds;

pub use config::PipelineConfig;
pub use error::PipelineError;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
