//! Repository for the `scene_submissions` table.

use scenegate_core::submission::SceneSubmission;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::scene_submission::SceneSubmissionRow;

/// Column list for scene_submissions queries.
const COLUMNS: &str = "id, template_id, assignment_id, user_id, scene_number, scene_title, \
    video_url, status, similarity_score, feedback, ai_suggestions, resubmission_count, \
    previous_submission_id, resubmission_history, submitted_at, last_updated_at, \
    reviewed_at, reviewed_by, manual_override";

/// Rows with no successor in their chain.
const NOT_SUPERSEDED: &str = "NOT EXISTS (SELECT 1 FROM scene_submissions n \
    WHERE n.previous_submission_id = s.id)";

pub struct SceneSubmissionRepo;

impl SceneSubmissionRepo {
    /// Insert a row built by the domain layer.
    pub async fn create(pool: &PgPool, s: &SceneSubmission) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO scene_submissions ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17, $18, $19)"
        );
        sqlx::query(&query)
            .bind(s.id)
            .bind(&s.template_id)
            .bind(&s.assignment_id)
            .bind(&s.user_id)
            .bind(s.scene_number)
            .bind(&s.scene_title)
            .bind(&s.video_url)
            .bind(s.status.as_str())
            .bind(s.similarity_score)
            .bind(&s.feedback)
            .bind(&s.ai_suggestions)
            .bind(s.resubmission_count)
            .bind(s.previous_submission_id)
            .bind(&s.resubmission_history)
            .bind(s.submitted_at)
            .bind(s.last_updated_at)
            .bind(s.reviewed_at)
            .bind(&s.reviewed_by)
            .bind(s.manual_override.as_ref().map(Json))
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<SceneSubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scene_submissions WHERE id = $1");
        sqlx::query_as::<_, SceneSubmissionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<SceneSubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scene_submissions WHERE id = ANY($1)");
        sqlx::query_as::<_, SceneSubmissionRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Most recent row for a scene slot.
    pub async fn find_latest_for_slot(
        pool: &PgPool,
        assignment_id: &str,
        user_id: &str,
        scene_number: i32,
    ) -> Result<Option<SceneSubmissionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scene_submissions
             WHERE assignment_id = $1 AND user_id = $2 AND scene_number = $3
             ORDER BY submitted_at DESC, resubmission_count DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, SceneSubmissionRow>(&query)
            .bind(assignment_id)
            .bind(user_id)
            .bind(scene_number)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_assignment_user(
        pool: &PgPool,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SceneSubmissionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scene_submissions
             WHERE assignment_id = $1 AND user_id = $2
             ORDER BY scene_number ASC, submitted_at ASC, resubmission_count ASC"
        );
        sqlx::query_as::<_, SceneSubmissionRow>(&query)
            .bind(assignment_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Review queue: pending rows that are still the head of their chain.
    pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<SceneSubmissionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scene_submissions s
             WHERE s.status = 'pending' AND {NOT_SUPERSEDED}
             ORDER BY s.submitted_at ASC
             LIMIT $1"
        );
        sqlx::query_as::<_, SceneSubmissionRow>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn is_superseded(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM scene_submissions WHERE previous_submission_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Write back the mutable review fields of a row that is still the head
    /// of its chain. Returns `false` if no such row was updated.
    pub async fn update_head(pool: &PgPool, s: &SceneSubmission) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE scene_submissions s SET
                status = $2,
                similarity_score = $3,
                feedback = $4,
                ai_suggestions = $5,
                last_updated_at = $6,
                reviewed_at = $7,
                reviewed_by = $8,
                manual_override = $9
             WHERE s.id = $1 AND {NOT_SUPERSEDED}"
        );
        let result = sqlx::query(&query)
            .bind(s.id)
            .bind(s.status.as_str())
            .bind(s.similarity_score)
            .bind(&s.feedback)
            .bind(&s.ai_suggestions)
            .bind(s.last_updated_at)
            .bind(s.reviewed_at)
            .bind(&s.reviewed_by)
            .bind(s.manual_override.as_ref().map(Json))
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_template(pool: &PgPool, template_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scene_submissions WHERE template_id = $1")
            .bind(template_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_user(pool: &PgPool, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scene_submissions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
