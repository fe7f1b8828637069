//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use scenegate_core::approval::ApprovalThreshold;
use scenegate_core::grid::SceneLayout;
use scenegate_core::submission::SceneSubmission;
use scenegate_core::types::SubmissionId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::scene_submission::into_submissions;
use crate::repositories::{
    ApprovalThresholdRepo, AutoApprovalCounterRepo, SceneLayoutRepo, SceneSubmissionRepo,
};
use crate::store::{
    classify, AutoApprovalCounter, LayoutOwner, LayoutStore, StoreError, SubmissionStore,
    ThresholdStore,
};

/// Store backed by a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn cap_to_i32(max: u32) -> i32 {
    i32::try_from(max).unwrap_or(i32::MAX)
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn insert(&self, submission: &SceneSubmission) -> Result<(), StoreError> {
        SceneSubmissionRepo::create(&self.pool, submission)
            .await
            .map_err(|e| {
                classify(e, || match submission.previous_submission_id {
                    Some(prev) => format!("Submission {prev} has already been resubmitted"),
                    None => format!("Submission {} already exists", submission.id),
                })
            })
    }

    async fn find_by_id(&self, id: SubmissionId) -> Result<Option<SceneSubmission>, StoreError> {
        SceneSubmissionRepo::find_by_id(&self.pool, id)
            .await?
            .map(SceneSubmission::try_from)
            .transpose()
    }

    async fn find_by_ids(&self, ids: &[SubmissionId]) -> Result<Vec<SceneSubmission>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        into_submissions(SceneSubmissionRepo::find_by_ids(&self.pool, ids).await?)
    }

    async fn find_latest_for_slot(
        &self,
        assignment_id: &str,
        user_id: &str,
        scene_number: i32,
    ) -> Result<Option<SceneSubmission>, StoreError> {
        SceneSubmissionRepo::find_latest_for_slot(&self.pool, assignment_id, user_id, scene_number)
            .await?
            .map(SceneSubmission::try_from)
            .transpose()
    }

    async fn list_for_assignment_user(
        &self,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SceneSubmission>, StoreError> {
        into_submissions(
            SceneSubmissionRepo::list_for_assignment_user(&self.pool, assignment_id, user_id).await?,
        )
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<SceneSubmission>, StoreError> {
        into_submissions(SceneSubmissionRepo::list_pending(&self.pool, limit).await?)
    }

    async fn is_superseded(&self, id: SubmissionId) -> Result<bool, StoreError> {
        Ok(SceneSubmissionRepo::is_superseded(&self.pool, id).await?)
    }

    async fn update(&self, submission: &SceneSubmission) -> Result<(), StoreError> {
        if SceneSubmissionRepo::update_head(&self.pool, submission).await? {
            return Ok(());
        }
        // Nothing updated: either the row is gone or it has a successor.
        match SceneSubmissionRepo::find_by_id(&self.pool, submission.id).await? {
            None => Err(StoreError::NotFound {
                entity: "SceneSubmission",
                id: submission.id.to_string(),
            }),
            Some(_) => Err(StoreError::Conflict(format!(
                "Submission {} has been superseded by a resubmission",
                submission.id
            ))),
        }
    }

    async fn delete_by_template(&self, template_id: &str) -> Result<u64, StoreError> {
        Ok(SceneSubmissionRepo::delete_by_template(&self.pool, template_id).await?)
    }

    async fn delete_by_user(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(SceneSubmissionRepo::delete_by_user(&self.pool, user_id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl ThresholdStore for PgStore {
    async fn find(
        &self,
        template_id: &str,
        manager_id: Option<&str>,
    ) -> Result<Option<ApprovalThreshold>, StoreError> {
        ApprovalThresholdRepo::find(&self.pool, template_id, manager_id)
            .await?
            .map(ApprovalThreshold::try_from)
            .transpose()
    }

    async fn upsert(&self, threshold: &ApprovalThreshold) -> Result<ApprovalThreshold, StoreError> {
        let row = ApprovalThresholdRepo::upsert(&self.pool, threshold)
            .await
            .map_err(|e| {
                classify(e, || {
                    format!("Threshold id {:?} is already in use", threshold.id)
                })
            })?;
        ApprovalThreshold::try_from(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(ApprovalThresholdRepo::delete(&self.pool, id).await?)
    }

    async fn list_for_manager(&self, manager_id: &str) -> Result<Vec<ApprovalThreshold>, StoreError> {
        ApprovalThresholdRepo::list_for_manager(&self.pool, manager_id)
            .await?
            .into_iter()
            .map(ApprovalThreshold::try_from)
            .collect()
    }
}

#[async_trait]
impl AutoApprovalCounter for PgStore {
    async fn used(&self, template_id: &str) -> Result<u32, StoreError> {
        let used = AutoApprovalCounterRepo::used(&self.pool, template_id).await?;
        Ok(u32::try_from(used).unwrap_or(0))
    }

    async fn try_acquire(&self, template_id: &str, max: u32) -> Result<bool, StoreError> {
        let claimed =
            AutoApprovalCounterRepo::try_increment(&self.pool, template_id, cap_to_i32(max)).await?;
        Ok(claimed.is_some())
    }

    async fn release(&self, template_id: &str) -> Result<(), StoreError> {
        Ok(AutoApprovalCounterRepo::decrement(&self.pool, template_id).await?)
    }

    async fn reset(&self, template_id: &str) -> Result<(), StoreError> {
        Ok(AutoApprovalCounterRepo::delete(&self.pool, template_id).await?)
    }
}

#[async_trait]
impl LayoutStore for PgStore {
    async fn put_layouts(
        &self,
        owner: LayoutOwner,
        owner_id: &str,
        scenes: &[SceneLayout],
    ) -> Result<(), StoreError> {
        SceneLayoutRepo::upsert(&self.pool, owner.as_str(), owner_id, scenes).await?;
        Ok(())
    }

    async fn get_layouts(
        &self,
        owner: LayoutOwner,
        owner_id: &str,
    ) -> Result<Option<Vec<SceneLayout>>, StoreError> {
        let row = SceneLayoutRepo::find(&self.pool, owner.as_str(), owner_id).await?;
        Ok(row.map(|r| r.scenes.0))
    }
}
