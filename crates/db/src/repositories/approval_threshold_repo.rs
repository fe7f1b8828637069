//! Repository for the `approval_thresholds` table.

use scenegate_core::approval::ApprovalThreshold;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::approval_threshold::ApprovalThresholdRow;

/// Column list for approval_thresholds queries.
const COLUMNS: &str = "id, template_id, manager_id, global_threshold, scene_threshold, \
    quality_threshold, custom_scene_thresholds, require_manual_review, auto_approval_enabled, \
    allow_manual_override, max_auto_approvals, required_quality_checks, created_at, updated_at";

pub struct ApprovalThresholdRepo;

impl ApprovalThresholdRepo {
    /// Exact scope lookup. `manager_id = None` matches the template-wide row.
    pub async fn find(
        pool: &PgPool,
        template_id: &str,
        manager_id: Option<&str>,
    ) -> Result<Option<ApprovalThresholdRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM approval_thresholds
             WHERE template_id = $1 AND manager_id IS NOT DISTINCT FROM $2"
        );
        sqlx::query_as::<_, ApprovalThresholdRow>(&query)
            .bind(template_id)
            .bind(manager_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the configuration for `(template_id, manager_id)`.
    ///
    /// A fresh id is generated on insert; on conflict the existing id is kept.
    pub async fn upsert(
        pool: &PgPool,
        t: &ApprovalThreshold,
    ) -> Result<ApprovalThresholdRow, sqlx::Error> {
        let manual_review: Vec<String> = t.require_manual_review.iter().cloned().collect();
        let query = format!(
            "INSERT INTO approval_thresholds
                (id, template_id, manager_id, global_threshold, scene_threshold,
                 quality_threshold, custom_scene_thresholds, require_manual_review,
                 auto_approval_enabled, allow_manual_override, max_auto_approvals,
                 required_quality_checks)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (template_id, (COALESCE(manager_id, '')))
             DO UPDATE SET
                global_threshold = EXCLUDED.global_threshold,
                scene_threshold = EXCLUDED.scene_threshold,
                quality_threshold = EXCLUDED.quality_threshold,
                custom_scene_thresholds = EXCLUDED.custom_scene_thresholds,
                require_manual_review = EXCLUDED.require_manual_review,
                auto_approval_enabled = EXCLUDED.auto_approval_enabled,
                allow_manual_override = EXCLUDED.allow_manual_override,
                max_auto_approvals = EXCLUDED.max_auto_approvals,
                required_quality_checks = EXCLUDED.required_quality_checks,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApprovalThresholdRow>(&query)
            .bind(t.id.unwrap_or_else(Uuid::now_v7))
            .bind(&t.template_id)
            .bind(&t.manager_id)
            .bind(t.global_threshold)
            .bind(t.scene_threshold)
            .bind(t.quality_threshold)
            .bind(Json(&t.custom_scene_thresholds))
            .bind(manual_review)
            .bind(t.auto_approval_enabled)
            .bind(t.allow_manual_override)
            .bind(i32::try_from(t.max_auto_approvals).unwrap_or(i32::MAX))
            .bind(&t.required_quality_checks)
            .fetch_one(pool)
            .await
    }

    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM approval_thresholds WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_manager(
        pool: &PgPool,
        manager_id: &str,
    ) -> Result<Vec<ApprovalThresholdRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM approval_thresholds
             WHERE manager_id = $1
             ORDER BY template_id ASC"
        );
        sqlx::query_as::<_, ApprovalThresholdRow>(&query)
            .bind(manager_id)
            .fetch_all(pool)
            .await
    }
}
