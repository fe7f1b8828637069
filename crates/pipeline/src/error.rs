use scenegate_core::error::CoreError;
use scenegate_db::StoreError;

/// Errors surfaced by pipeline operations.
///
/// Provider failures never appear here; they are absorbed by the fallback
/// embedder.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Comparison was cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::Core(CoreError::NotFound {
            entity,
            id: id.to_string(),
        })
    }
}
