//! Scene submission rows.

use scenegate_core::submission::{ManualOverride, SceneSubmission};
use scenegate_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

/// A row from the `scene_submissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SceneSubmissionRow {
    pub id: Uuid,
    pub template_id: String,
    pub assignment_id: String,
    pub user_id: String,
    pub scene_number: i32,
    pub scene_title: Option<String>,
    pub video_url: Option<String>,
    pub status: String,
    pub similarity_score: Option<f64>,
    pub feedback: Vec<String>,
    pub ai_suggestions: Vec<String>,
    pub resubmission_count: i32,
    pub previous_submission_id: Option<Uuid>,
    pub resubmission_history: Vec<Uuid>,
    pub submitted_at: Timestamp,
    pub last_updated_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<String>,
    pub manual_override: Option<Json<ManualOverride>>,
}

impl TryFrom<SceneSubmissionRow> for SceneSubmission {
    type Error = StoreError;

    fn try_from(row: SceneSubmissionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| StoreError::InvalidData(format!("submission {} has status '{}'", row.id, row.status)))?;

        Ok(Self {
            id: row.id,
            template_id: row.template_id,
            assignment_id: row.assignment_id,
            user_id: row.user_id,
            scene_number: row.scene_number,
            scene_title: row.scene_title,
            video_url: row.video_url,
            status,
            similarity_score: row.similarity_score,
            feedback: row.feedback,
            ai_suggestions: row.ai_suggestions,
            resubmission_count: row.resubmission_count,
            previous_submission_id: row.previous_submission_id,
            resubmission_history: row.resubmission_history,
            submitted_at: row.submitted_at,
            last_updated_at: row.last_updated_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            manual_override: row.manual_override.map(|Json(o)| o),
        })
    }
}

/// Convert a batch of rows, failing on the first bad one.
pub fn into_submissions(rows: Vec<SceneSubmissionRow>) -> Result<Vec<SceneSubmission>, StoreError> {
    rows.into_iter().map(SceneSubmission::try_from).collect()
}
