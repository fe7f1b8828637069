//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?managerId=` narrowing for threshold lookups.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerParams {
    pub manager_id: Option<String>,
}

/// `?limit=` for the pending review queue. Clamped in the orchestrator.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}
