use std::sync::Arc;

use scenegate_db::{LayoutStore, SubmissionStore};
use scenegate_pipeline::orchestrator::DecisionOrchestrator;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: DecisionOrchestrator,
    /// Direct layout access for the upload endpoint.
    pub layouts: Arc<dyn LayoutStore>,
    /// Used by the health check.
    pub submissions: Arc<dyn SubmissionStore>,
    pub config: Arc<ServerConfig>,
    /// Cancelled on shutdown so in-flight comparisons stop early.
    pub shutdown: CancellationToken,
}
