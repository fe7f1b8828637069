//! Handlers for ad-hoc and stored layout comparisons.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use scenegate_core::grid::SceneLayout;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `POST /comparisons`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub template_scenes: Vec<SceneLayout>,
    pub user_scenes: Vec<SceneLayout>,
}

/// POST /api/v1/comparisons
///
/// Compare two explicit layout lists scene by scene.
pub async fn compare_layouts(
    State(state): State<AppState>,
    Json(input): Json<CompareRequest>,
) -> AppResult<impl IntoResponse> {
    let cancel = state.shutdown.child_token();
    let outcome = state
        .orchestrator
        .comparison()
        .compare_layouts(&input.template_scenes, &input.user_scenes, &cancel)
        .await?;

    tracing::info!(
        overall_score = outcome.result.overall_score,
        scenes = outcome.result.scene_count(),
        degraded = outcome.result.degraded,
        "Ad-hoc comparison completed"
    );

    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/comparisons/{template_id}/{video_id}
///
/// Compare the stored layouts of a template and a submitted video.
pub async fn compare_stored(
    State(state): State<AppState>,
    Path((template_id, video_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let cancel = state.shutdown.child_token();
    let outcome = state
        .orchestrator
        .comparison()
        .compare_stored(&template_id, &video_id, &cancel)
        .await?;

    tracing::info!(
        template_id = %template_id,
        video_id = %video_id,
        overall_score = outcome.result.overall_score,
        degraded = outcome.result.degraded,
        "Stored comparison completed"
    );

    Ok(Json(DataResponse { data: outcome }))
}
