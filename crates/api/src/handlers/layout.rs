//! Handler for storing pre-embedding scene layouts.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use scenegate_core::grid::SceneLayout;
use scenegate_db::LayoutOwner;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PutLayouts {
    pub scenes: Vec<SceneLayout>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLayouts {
    pub owner_kind: String,
    pub owner_id: String,
    pub scene_count: usize,
}

/// PUT /api/v1/layouts/{owner_kind}/{owner_id}
///
/// Replace the scene layouts of a template or a video. `owner_kind` is
/// `template` or `video`.
pub async fn put_layouts(
    State(state): State<AppState>,
    Path((owner_kind, owner_id)): Path<(String, String)>,
    Json(input): Json<PutLayouts>,
) -> AppResult<impl IntoResponse> {
    let owner: LayoutOwner = owner_kind
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown layout owner '{owner_kind}'")))?;
    if owner_id.trim().is_empty() {
        return Err(AppError::BadRequest("Owner ID is required".into()));
    }

    state.layouts.put_layouts(owner, &owner_id, &input.scenes).await?;

    tracing::info!(
        owner = %owner,
        owner_id = %owner_id,
        scenes = input.scenes.len(),
        "Scene layouts stored"
    );

    Ok(Json(DataResponse {
        data: StoredLayouts {
            owner_kind: owner.to_string(),
            owner_id,
            scene_count: input.scenes.len(),
        },
    }))
}
