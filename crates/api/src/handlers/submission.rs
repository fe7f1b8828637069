//! Handlers for scene submissions: upload, review and queries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use scenegate_core::types::SubmissionId;
use scenegate_pipeline::orchestrator::{OverrideRequest, SubmitScene};
use serde::Deserialize;

use crate::error::AppResult;
use crate::query::LimitParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub reviewer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub reviewer_id: String,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub total_scenes: usize,
}

/// POST /api/v1/submissions
///
/// Score an upload against its template scene and apply the approval chain.
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<SubmitScene>,
) -> AppResult<impl IntoResponse> {
    let cancel = state.shutdown.child_token();
    let decision = state.orchestrator.submit(input, &cancel).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: decision })))
}

/// GET /api/v1/submissions/{id}
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<SubmissionId>,
) -> AppResult<impl IntoResponse> {
    let submission = state.orchestrator.get(id).await?;
    Ok(Json(DataResponse { data: submission }))
}

/// GET /api/v1/submissions/{id}/history
///
/// The resubmission chain ending at `id`, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<SubmissionId>,
) -> AppResult<impl IntoResponse> {
    let history = state.orchestrator.history(id).await?;
    Ok(Json(DataResponse { data: history }))
}

/// POST /api/v1/submissions/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<SubmissionId>,
    Json(input): Json<ApproveRequest>,
) -> AppResult<impl IntoResponse> {
    let submission = state.orchestrator.approve(id, &input.reviewer_id).await?;
    Ok(Json(DataResponse { data: submission }))
}

/// POST /api/v1/submissions/{id}/reject
///
/// Feedback is required. The row stays pending until the creator resubmits.
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<SubmissionId>,
    Json(input): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let submission = state
        .orchestrator
        .reject(id, &input.reviewer_id, &input.feedback)
        .await?;
    Ok(Json(DataResponse { data: submission }))
}

/// POST /api/v1/submissions/{id}/override
pub async fn override_decision(
    State(state): State<AppState>,
    Path(id): Path<SubmissionId>,
    Json(input): Json<OverrideRequest>,
) -> AppResult<impl IntoResponse> {
    let submission = state.orchestrator.override_decision(id, &input).await?;
    Ok(Json(DataResponse { data: submission }))
}

/// GET /api/v1/submissions/pending?limit=
pub async fn list_pending(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    let pending = state.orchestrator.pending(params.limit).await?;
    Ok(Json(DataResponse { data: pending }))
}

/// GET /api/v1/assignments/{assignment_id}/users/{user_id}/submissions
pub async fn list_for_assignment_user(
    State(state): State<AppState>,
    Path((assignment_id, user_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let rows = state
        .orchestrator
        .list_for_assignment_user(&assignment_id, &user_id)
        .await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/assignments/{assignment_id}/users/{user_id}/scenes/{scene_number}/latest
pub async fn latest_for_slot(
    State(state): State<AppState>,
    Path((assignment_id, user_id, scene_number)): Path<(String, String, i32)>,
) -> AppResult<impl IntoResponse> {
    let submission = state
        .orchestrator
        .latest_for_slot(&assignment_id, &user_id, scene_number)
        .await?;
    Ok(Json(DataResponse { data: submission }))
}

/// GET /api/v1/assignments/{assignment_id}/users/{user_id}/progress?totalScenes=
pub async fn get_progress(
    State(state): State<AppState>,
    Path((assignment_id, user_id)): Path<(String, String)>,
    Query(params): Query<ProgressParams>,
) -> AppResult<impl IntoResponse> {
    let progress = state
        .orchestrator
        .progress(&assignment_id, &user_id, params.total_scenes)
        .await?;
    Ok(Json(DataResponse { data: progress }))
}

/// DELETE /api/v1/templates/{template_id}/submissions
///
/// Cascade delete when a template is removed. Also resets its auto-approval
/// counter.
pub async fn delete_template_submissions(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.orchestrator.delete_template_submissions(&template_id).await?;
    Ok(Json(DataResponse { data: deleted }))
}

/// DELETE /api/v1/users/{user_id}/submissions
pub async fn delete_user_submissions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.orchestrator.delete_user_submissions(&user_id).await?;
    Ok(Json(DataResponse { data: deleted }))
}
