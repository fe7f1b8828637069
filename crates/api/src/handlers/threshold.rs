//! Handlers for approval threshold configuration.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use scenegate_core::approval::ApprovalThreshold;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::query::ManagerParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveParams {
    pub template_id: String,
    pub scene_id: Option<String>,
    pub manager_id: Option<String>,
}

/// PUT /api/v1/thresholds
///
/// Create or replace the configuration for `(templateId, managerId)`.
pub async fn upsert_threshold(
    State(state): State<AppState>,
    Json(input): Json<ApprovalThreshold>,
) -> AppResult<impl IntoResponse> {
    let saved = state.orchestrator.thresholds().upsert(input).await?;
    Ok(Json(DataResponse { data: saved }))
}

/// GET /api/v1/thresholds/effective?templateId=&sceneId=&managerId=
///
/// Without `sceneId` only the auto-approval status is meaningful.
pub async fn get_effective(
    State(state): State<AppState>,
    Query(params): Query<EffectiveParams>,
) -> AppResult<impl IntoResponse> {
    let effective = state
        .orchestrator
        .thresholds()
        .effective(
            &params.template_id,
            params.scene_id.as_deref(),
            params.manager_id.as_deref(),
        )
        .await?;
    Ok(Json(DataResponse { data: effective }))
}

/// GET /api/v1/thresholds/{template_id}?managerId=
///
/// The resolved configuration; defaults when nothing is stored.
pub async fn get_for_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Query(params): Query<ManagerParams>,
) -> AppResult<impl IntoResponse> {
    let config = state
        .orchestrator
        .thresholds()
        .resolve(&template_id, params.manager_id.as_deref())
        .await?;
    Ok(Json(DataResponse { data: config }))
}

/// DELETE /api/v1/thresholds/{id}
pub async fn delete_threshold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.thresholds().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/managers/{manager_id}/thresholds
pub async fn list_for_manager(
    State(state): State<AppState>,
    Path(manager_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let thresholds = state.orchestrator.thresholds().list_for_manager(&manager_id).await?;
    Ok(Json(DataResponse { data: thresholds }))
}

/// GET /api/v1/managers/{manager_id}/analytics
pub async fn get_analytics(
    State(state): State<AppState>,
    Path(manager_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let analytics = state.orchestrator.thresholds().analytics(&manager_id).await?;
    Ok(Json(DataResponse { data: analytics }))
}
