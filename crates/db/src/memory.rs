//! In-process store for tests and running without a database.
//!
//! Each table is a map behind a `tokio` lock. Operations that must be atomic
//! (counter claims, chain-head checks) hold a single write lock for the whole
//! check-and-write.

use std::collections::HashMap;

use async_trait::async_trait;
use scenegate_core::approval::ApprovalThreshold;
use scenegate_core::grid::SceneLayout;
use scenegate_core::submission::{SceneSubmission, SubmissionStatus};
use scenegate_core::types::SubmissionId;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::store::{
    AutoApprovalCounter, LayoutOwner, LayoutStore, StoreError, SubmissionStore, ThresholdStore,
};

#[derive(Default)]
pub struct MemoryStore {
    submissions: RwLock<HashMap<SubmissionId, SceneSubmission>>,
    thresholds: RwLock<HashMap<Uuid, ApprovalThreshold>>,
    counters: Mutex<HashMap<String, u32>>,
    layouts: RwLock<HashMap<(LayoutOwner, String), Vec<SceneLayout>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_successor(rows: &HashMap<SubmissionId, SceneSubmission>, id: SubmissionId) -> bool {
    rows.values().any(|s| s.previous_submission_id == Some(id))
}

fn sort_by_slot(rows: &mut [SceneSubmission]) {
    rows.sort_by(|a, b| {
        a.scene_number
            .cmp(&b.scene_number)
            .then(a.submitted_at.cmp(&b.submitted_at))
            .then(a.resubmission_count.cmp(&b.resubmission_count))
    });
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, submission: &SceneSubmission) -> Result<(), StoreError> {
        let mut rows = self.submissions.write().await;
        if rows.contains_key(&submission.id) {
            return Err(StoreError::Conflict(format!(
                "Submission {} already exists",
                submission.id
            )));
        }
        if let Some(prev) = submission.previous_submission_id {
            if has_successor(&rows, prev) {
                return Err(StoreError::Conflict(format!(
                    "Submission {prev} has already been resubmitted"
                )));
            }
        }
        rows.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SubmissionId) -> Result<Option<SceneSubmission>, StoreError> {
        Ok(self.submissions.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[SubmissionId]) -> Result<Vec<SceneSubmission>, StoreError> {
        let rows = self.submissions.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn find_latest_for_slot(
        &self,
        assignment_id: &str,
        user_id: &str,
        scene_number: i32,
    ) -> Result<Option<SceneSubmission>, StoreError> {
        let rows = self.submissions.read().await;
        Ok(rows
            .values()
            .filter(|s| {
                s.assignment_id == assignment_id
                    && s.user_id == user_id
                    && s.scene_number == scene_number
            })
            .max_by(|a, b| {
                a.submitted_at
                    .cmp(&b.submitted_at)
                    .then(a.resubmission_count.cmp(&b.resubmission_count))
            })
            .cloned())
    }

    async fn list_for_assignment_user(
        &self,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SceneSubmission>, StoreError> {
        let rows = self.submissions.read().await;
        let mut matching: Vec<SceneSubmission> = rows
            .values()
            .filter(|s| s.assignment_id == assignment_id && s.user_id == user_id)
            .cloned()
            .collect();
        sort_by_slot(&mut matching);
        Ok(matching)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<SceneSubmission>, StoreError> {
        let rows = self.submissions.read().await;
        let mut pending: Vec<SceneSubmission> = rows
            .values()
            .filter(|s| s.status == SubmissionStatus::Pending && !has_successor(&rows, s.id))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        pending.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(pending)
    }

    async fn is_superseded(&self, id: SubmissionId) -> Result<bool, StoreError> {
        Ok(has_successor(&*self.submissions.read().await, id))
    }

    async fn update(&self, submission: &SceneSubmission) -> Result<(), StoreError> {
        let mut rows = self.submissions.write().await;
        if !rows.contains_key(&submission.id) {
            return Err(StoreError::NotFound {
                entity: "SceneSubmission",
                id: submission.id.to_string(),
            });
        }
        if has_successor(&rows, submission.id) {
            return Err(StoreError::Conflict(format!(
                "Submission {} has been superseded by a resubmission",
                submission.id
            )));
        }
        rows.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn delete_by_template(&self, template_id: &str) -> Result<u64, StoreError> {
        let mut rows = self.submissions.write().await;
        let before = rows.len();
        rows.retain(|_, s| s.template_id != template_id);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_by_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut rows = self.submissions.write().await;
        let before = rows.len();
        rows.retain(|_, s| s.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ThresholdStore for MemoryStore {
    async fn find(
        &self,
        template_id: &str,
        manager_id: Option<&str>,
    ) -> Result<Option<ApprovalThreshold>, StoreError> {
        let rows = self.thresholds.read().await;
        Ok(rows
            .values()
            .find(|t| t.template_id == template_id && t.manager_id.as_deref() == manager_id)
            .cloned())
    }

    async fn upsert(&self, threshold: &ApprovalThreshold) -> Result<ApprovalThreshold, StoreError> {
        let mut rows = self.thresholds.write().await;
        let existing_id = rows
            .values()
            .find(|t| t.template_id == threshold.template_id && t.manager_id == threshold.manager_id)
            .and_then(|t| t.id);

        let id = match existing_id {
            Some(id) => id,
            None => {
                let id = threshold.id.unwrap_or_else(Uuid::now_v7);
                if rows.contains_key(&id) {
                    return Err(StoreError::Conflict(format!(
                        "Threshold id {id} is already in use"
                    )));
                }
                id
            }
        };

        let mut stored = threshold.clone();
        stored.id = Some(id);
        rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.thresholds.write().await.remove(&id).is_some())
    }

    async fn list_for_manager(&self, manager_id: &str) -> Result<Vec<ApprovalThreshold>, StoreError> {
        let rows = self.thresholds.read().await;
        let mut matching: Vec<ApprovalThreshold> = rows
            .values()
            .filter(|t| t.manager_id.as_deref() == Some(manager_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        Ok(matching)
    }
}

#[async_trait]
impl AutoApprovalCounter for MemoryStore {
    async fn used(&self, template_id: &str) -> Result<u32, StoreError> {
        Ok(self
            .counters
            .lock()
            .await
            .get(template_id)
            .copied()
            .unwrap_or(0))
    }

    async fn try_acquire(&self, template_id: &str, max: u32) -> Result<bool, StoreError> {
        let mut counters = self.counters.lock().await;
        let used = counters.entry(template_id.to_string()).or_insert(0);
        if *used >= max {
            return Ok(false);
        }
        *used += 1;
        Ok(true)
    }

    async fn release(&self, template_id: &str) -> Result<(), StoreError> {
        if let Some(used) = self.counters.lock().await.get_mut(template_id) {
            *used = used.saturating_sub(1);
        }
        Ok(())
    }

    async fn reset(&self, template_id: &str) -> Result<(), StoreError> {
        self.counters.lock().await.remove(template_id);
        Ok(())
    }
}

#[async_trait]
impl LayoutStore for MemoryStore {
    async fn put_layouts(
        &self,
        owner: LayoutOwner,
        owner_id: &str,
        scenes: &[SceneLayout],
    ) -> Result<(), StoreError> {
        self.layouts
            .write()
            .await
            .insert((owner, owner_id.to_string()), scenes.to_vec());
        Ok(())
    }

    async fn get_layouts(
        &self,
        owner: LayoutOwner,
        owner_id: &str,
    ) -> Result<Option<Vec<SceneLayout>>, StoreError> {
        Ok(self
            .layouts
            .read()
            .await
            .get(&(owner, owner_id.to_string()))
            .cloned())
    }
}
