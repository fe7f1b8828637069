//! Decision orchestrator: score a submission, resolve policy, and drive the
//! lifecycle transition.
//!
//! Flow for a new upload:
//!
//! 1. Find the current head of the `(assignment, user, scene)` chain and
//!    build either a fresh row or a resubmission that supersedes it.
//! 2. Compare the submitted scene layout with the template's layout for the
//!    same scene.
//! 3. Run the approval precedence chain. A provisional auto-approval must
//!    still claim a slot on the template's counter; losing that race turns
//!    the decision into a manual one.
//! 4. Persist the row. Nothing is written if the comparison was cancelled.
//!
//! A store failure while scoring or deciding does not fail the upload. The
//! row is written with a degraded result and left pending under
//! [`ManualReason::StoreUnavailable`]. Only the final insert propagates.

use std::sync::Arc;

use chrono::Utc;
use scenegate_core::approval::{decide, ApprovalDecision, ApprovalThreshold, ManualReason};
use scenegate_core::error::CoreError;
use scenegate_core::grid::{SceneComparison, SceneLayout};
use scenegate_core::submission::{
    summarize_progress, NewSceneSubmission, SceneSubmission, SubmissionProgress,
};
use scenegate_core::types::SubmissionId;
use scenegate_db::{AutoApprovalCounter, LayoutOwner, LayoutStore, StoreError, SubmissionStore};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::comparison::ComparisonService;
use crate::error::PipelineError;
use crate::suggestions::{suggest, ReviewRequest, SuggestionProvider};
use crate::thresholds::ThresholdService;

/// Default page size for the pending review queue.
pub const DEFAULT_PENDING_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

/// An upload to score.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScene {
    #[serde(flatten)]
    pub submission: NewSceneSubmission,
    /// Layout of the submitted recording.
    pub submitted_layout: SceneLayout,
    /// Template layout for this scene. When absent, the stored template
    /// layouts are used.
    #[serde(default)]
    pub template_layout: Option<SceneLayout>,
    /// Manager whose threshold configuration applies, if any.
    #[serde(default)]
    pub manager_id: Option<String>,
}

/// Result of scoring and deciding one upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDecision {
    pub submission: SceneSubmission,
    pub decision: ApprovalDecision,
    pub comparison: SceneComparison,
    pub degraded: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub approved: bool,
    pub reason: String,
    pub reviewer_id: String,
    #[serde(default)]
    pub manager_id: Option<String>,
}

/// Rows removed by a cascade delete.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    pub deleted: u64,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DecisionOrchestrator {
    submissions: Arc<dyn SubmissionStore>,
    layouts: Arc<dyn LayoutStore>,
    counter: Arc<dyn AutoApprovalCounter>,
    thresholds: ThresholdService,
    comparison: ComparisonService,
    suggestions: Option<Arc<dyn SuggestionProvider>>,
}

/// Map store conflicts on an existing row to lifecycle errors.
fn transition_error(err: StoreError) -> PipelineError {
    match err {
        StoreError::Conflict(msg) => PipelineError::Core(CoreError::InvalidTransition(msg)),
        other => PipelineError::Store(other),
    }
}

impl DecisionOrchestrator {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        layouts: Arc<dyn LayoutStore>,
        counter: Arc<dyn AutoApprovalCounter>,
        thresholds: ThresholdService,
        comparison: ComparisonService,
    ) -> Self {
        Self {
            submissions,
            layouts,
            counter,
            thresholds,
            comparison,
            suggestions: None,
        }
    }

    pub fn with_suggestions(mut self, provider: Arc<dyn SuggestionProvider>) -> Self {
        self.suggestions = Some(provider);
        self
    }

    pub fn thresholds(&self) -> &ThresholdService {
        &self.thresholds
    }

    pub fn comparison(&self) -> &ComparisonService {
        &self.comparison
    }

    // -- submit ----------------------------------------------------------------

    pub async fn submit(
        &self,
        request: SubmitScene,
        cancel: &CancellationToken,
    ) -> Result<SubmissionDecision, PipelineError> {
        request.submission.validate()?;
        let now = Utc::now();
        let input = request.submission;

        let previous = self
            .submissions
            .find_latest_for_slot(&input.assignment_id, &input.user_id, input.scene_number)
            .await?;
        let mut submission = match &previous {
            Some(prev) => prev.resubmit(input, now)?,
            None => SceneSubmission::new(input, now),
        };

        let template_layout = match request.template_layout {
            Some(layout) => Some(layout),
            None => match self.stored_template_scene(&submission).await {
                Ok(layout) => Some(layout),
                Err(PipelineError::Store(err)) => {
                    tracing::warn!(
                        error = %err,
                        template_id = %submission.template_id,
                        "Template layout unavailable, scoring with low confidence"
                    );
                    None
                }
                Err(other) => return Err(other),
            },
        };

        let (comparison, mut degraded) = match &template_layout {
            Some(template) => {
                let outcome = self
                    .comparison
                    .compare_layouts(
                        std::slice::from_ref(template),
                        std::slice::from_ref(&request.submitted_layout),
                        cancel,
                    )
                    .await?;
                let degraded = outcome.result.degraded;
                let scene = outcome.result.scene_comparisons.into_iter().next().ok_or_else(|| {
                    CoreError::Internal("single-scene comparison produced no scenes".to_string())
                })?;
                (scene, degraded)
            }
            None => (SceneComparison::uniform(self.comparison.fallback_score()), true),
        };
        let score = comparison.similarity;
        let scene_id = submission.scene_id();

        // Without a template layout or a readable policy the score is never
        // eligible for auto-approval.
        let mut store_unavailable = template_layout.is_none();
        let config = match self
            .thresholds
            .resolve(&submission.template_id, request.manager_id.as_deref())
            .await
        {
            Ok(config) => config,
            Err(PipelineError::Store(err)) => {
                tracing::warn!(
                    error = %err,
                    template_id = %submission.template_id,
                    "Threshold store unavailable, leaving submission for review"
                );
                store_unavailable = true;
                ApprovalThreshold::defaults_for(&submission.template_id)
            }
            Err(other) => return Err(other),
        };

        let mut decision = if store_unavailable {
            ApprovalDecision::Manual(ManualReason::StoreUnavailable)
        } else {
            match self.counter.used(&submission.template_id).await {
                Ok(used) => decide(&config, &scene_id, score, used),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        template_id = %submission.template_id,
                        "Auto-approval counter unavailable, leaving submission for review"
                    );
                    ApprovalDecision::Manual(ManualReason::StoreUnavailable)
                }
            }
        };

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut claimed_slot = false;
        if decision.is_auto_approve() {
            match self
                .counter
                .try_acquire(&submission.template_id, config.max_auto_approvals)
                .await
            {
                Ok(true) => claimed_slot = true,
                Ok(false) => {
                    decision = ApprovalDecision::Manual(ManualReason::AutoApprovalCapReached {
                        max_auto_approvals: config.max_auto_approvals,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        template_id = %submission.template_id,
                        "Failed to claim auto-approval slot, leaving submission for review"
                    );
                    decision = ApprovalDecision::Manual(ManualReason::StoreUnavailable);
                }
            }
        }
        if decision == ApprovalDecision::Manual(ManualReason::StoreUnavailable) {
            degraded = true;
        }

        let suggestions = if claimed_slot {
            Vec::new()
        } else {
            let empty = SceneLayout::default();
            let review = ReviewRequest {
                scene_number: submission.scene_number,
                similarity: score,
                threshold: config.effective_threshold(&scene_id),
                template: template_layout.as_ref().unwrap_or(&empty),
                submitted: &request.submitted_layout,
            };
            suggest(self.suggestions.as_deref(), &review, &comparison).await
        };

        submission.record_score(score, suggestions, now);
        if claimed_slot {
            submission.auto_approve(now)?;
        }

        if let Err(err) = self.submissions.insert(&submission).await {
            if claimed_slot {
                if let Err(release_err) = self.counter.release(&submission.template_id).await {
                    tracing::error!(error = %release_err, "Failed to release auto-approval slot");
                }
            }
            return Err(err.into());
        }

        match decision {
            ApprovalDecision::AutoApprove { threshold, .. } => tracing::info!(
                submission_id = %submission.id,
                template_id = %submission.template_id,
                scene_number = submission.scene_number,
                score,
                threshold,
                "Submission auto-approved"
            ),
            ApprovalDecision::Manual(reason) => tracing::info!(
                submission_id = %submission.id,
                template_id = %submission.template_id,
                scene_number = submission.scene_number,
                score,
                reason = ?reason,
                "Submission left for manual review"
            ),
        }

        Ok(SubmissionDecision {
            submission,
            decision,
            comparison,
            degraded,
        })
    }

    async fn stored_template_scene(&self, submission: &SceneSubmission) -> Result<SceneLayout, PipelineError> {
        let scenes = self
            .layouts
            .get_layouts(LayoutOwner::Template, &submission.template_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("TemplateLayout", &submission.template_id))?;

        let index = usize::try_from(submission.scene_number - 1).unwrap_or(usize::MAX);
        scenes.into_iter().nth(index).ok_or_else(|| {
            PipelineError::not_found(
                "TemplateScene",
                format!("{}#{}", submission.template_id, submission.scene_number),
            )
        })
    }

    // -- review ----------------------------------------------------------------

    /// Load a row that is still the head of its chain.
    async fn load_head(&self, id: SubmissionId) -> Result<SceneSubmission, PipelineError> {
        let submission = self
            .submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("SceneSubmission", id))?;
        if self.submissions.is_superseded(id).await? {
            return Err(CoreError::InvalidTransition(format!(
                "Submission {id} has been superseded by a resubmission"
            ))
            .into());
        }
        Ok(submission)
    }

    pub async fn approve(&self, id: SubmissionId, reviewer_id: &str) -> Result<SceneSubmission, PipelineError> {
        let mut submission = self.load_head(id).await?;
        submission.approve(reviewer_id, Utc::now())?;
        self.submissions.update(&submission).await.map_err(transition_error)?;
        tracing::info!(submission_id = %id, reviewer_id, "Submission approved");
        Ok(submission)
    }

    pub async fn reject(
        &self,
        id: SubmissionId,
        reviewer_id: &str,
        feedback: &str,
    ) -> Result<SceneSubmission, PipelineError> {
        let mut submission = self.load_head(id).await?;
        submission.reject(reviewer_id, feedback, Utc::now())?;
        self.submissions.update(&submission).await.map_err(transition_error)?;
        tracing::info!(submission_id = %id, reviewer_id, "Submission rejected, awaiting resubmission");
        Ok(submission)
    }

    pub async fn override_decision(
        &self,
        id: SubmissionId,
        request: &OverrideRequest,
    ) -> Result<SceneSubmission, PipelineError> {
        let mut submission = self.load_head(id).await?;
        let config = self
            .thresholds
            .resolve(&submission.template_id, request.manager_id.as_deref())
            .await?;
        if !config.allow_manual_override {
            return Err(CoreError::Conflict(format!(
                "Manual override is disabled for template {}",
                submission.template_id
            ))
            .into());
        }

        submission.apply_override(request.approved, &request.reason, &request.reviewer_id, Utc::now())?;
        self.submissions.update(&submission).await.map_err(transition_error)?;
        tracing::info!(
            submission_id = %id,
            reviewer_id = %request.reviewer_id,
            approved = request.approved,
            original_score = ?submission.similarity_score,
            "Manual override applied"
        );
        Ok(submission)
    }

    // -- queries ---------------------------------------------------------------

    pub async fn get(&self, id: SubmissionId) -> Result<SceneSubmission, PipelineError> {
        self.submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("SceneSubmission", id))
    }

    /// The chain ending at `id`, oldest first, including `id` itself.
    pub async fn history(&self, id: SubmissionId) -> Result<Vec<SceneSubmission>, PipelineError> {
        let head = self.get(id).await?;
        let mut earlier = self.submissions.find_by_ids(&head.resubmission_history).await?;
        earlier.sort_by_key(|s| {
            head.resubmission_history
                .iter()
                .position(|h| *h == s.id)
                .unwrap_or(usize::MAX)
        });
        earlier.push(head);
        Ok(earlier)
    }

    pub async fn latest_for_slot(
        &self,
        assignment_id: &str,
        user_id: &str,
        scene_number: i32,
    ) -> Result<SceneSubmission, PipelineError> {
        self.submissions
            .find_latest_for_slot(assignment_id, user_id, scene_number)
            .await?
            .ok_or_else(|| {
                PipelineError::not_found(
                    "SceneSubmission",
                    format!("{assignment_id}/{user_id}#{scene_number}"),
                )
            })
    }

    /// Every row for an (assignment, user), ordered by scene then time.
    pub async fn list_for_assignment_user(
        &self,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SceneSubmission>, PipelineError> {
        Ok(self
            .submissions
            .list_for_assignment_user(assignment_id, user_id)
            .await?)
    }

    pub async fn pending(&self, limit: Option<i64>) -> Result<Vec<SceneSubmission>, PipelineError> {
        let limit = limit.unwrap_or(DEFAULT_PENDING_LIMIT).clamp(1, 1000);
        Ok(self.submissions.list_pending(limit).await?)
    }

    pub async fn progress(
        &self,
        assignment_id: &str,
        user_id: &str,
        total_scenes: usize,
    ) -> Result<SubmissionProgress, PipelineError> {
        let rows = self.list_for_assignment_user(assignment_id, user_id).await?;

        // Rows are ordered by scene then time, so the last of each run is the head.
        let mut latest: Vec<SceneSubmission> = Vec::new();
        for row in rows {
            match latest.last_mut() {
                Some(last) if last.scene_number == row.scene_number => *last = row,
                _ => latest.push(row),
            }
        }
        Ok(summarize_progress(&latest, total_scenes))
    }

    // -- cascade ---------------------------------------------------------------

    pub async fn delete_template_submissions(&self, template_id: &str) -> Result<DeletedCount, PipelineError> {
        let deleted = self.submissions.delete_by_template(template_id).await?;
        self.counter.reset(template_id).await?;
        tracing::info!(template_id, deleted, "Template submissions deleted");
        Ok(DeletedCount { deleted })
    }

    pub async fn delete_user_submissions(&self, user_id: &str) -> Result<DeletedCount, PipelineError> {
        let deleted = self.submissions.delete_by_user(user_id).await?;
        tracing::info!(user_id, deleted, "User submissions deleted");
        Ok(DeletedCount { deleted })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use scenegate_core::submission::SubmissionStatus;
    use scenegate_db::MemoryStore;

    use scenegate_db::ThresholdStore;

    use super::*;
    use crate::test_support::{embedder, uniform, DownStore};

    fn orchestrator() -> (DecisionOrchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator_over(store.clone(), store.clone(), store.clone(), store.clone());
        (orch, store)
    }

    fn orchestrator_over(
        submissions: Arc<MemoryStore>,
        thresholds: Arc<dyn ThresholdStore>,
        counter: Arc<dyn AutoApprovalCounter>,
        layouts: Arc<dyn LayoutStore>,
    ) -> DecisionOrchestrator {
        let comparison = ComparisonService::new(embedder(), layouts.clone(), 0.1);
        DecisionOrchestrator::new(
            submissions,
            layouts,
            counter.clone(),
            ThresholdService::new(thresholds, counter),
            comparison,
        )
    }

    fn upload(scene: i32, template: &str, submitted: &str) -> SubmitScene {
        SubmitScene {
            submission: NewSceneSubmission {
                template_id: "tpl".into(),
                assignment_id: "asg".into(),
                user_id: "usr".into(),
                scene_number: scene,
                scene_title: None,
                video_url: None,
            },
            submitted_layout: uniform(submitted),
            template_layout: Some(uniform(template)),
            manager_id: None,
        }
    }

    async fn save_config(orch: &DecisionOrchestrator, edit: impl FnOnce(&mut ApprovalThreshold)) {
        let mut config = ApprovalThreshold::defaults_for("tpl");
        edit(&mut config);
        orch.thresholds().upsert(config).await.unwrap();
    }

    // -- submit --------------------------------------------------------------

    #[tokio::test]
    async fn qualifying_score_is_auto_approved_by_system() {
        let (orch, store) = orchestrator();
        let out = orch
            .submit(upload(1, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(out.decision.is_auto_approve());
        assert_eq!(out.submission.status, SubmissionStatus::Approved);
        assert_eq!(out.submission.reviewed_by.as_deref(), Some("system"));
        assert!(out.submission.ai_suggestions.is_empty());
        assert_eq!(store.used("tpl").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn forced_review_stays_pending_with_perfect_score() {
        let (orch, _) = orchestrator();
        save_config(&orch, |c| {
            c.require_manual_review.insert("1".into());
        })
        .await;

        let out = orch
            .submit(upload(1, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.decision, ApprovalDecision::Manual(ManualReason::ForcedReview));
        assert!(out.submission.is_pending());
        assert_eq!(out.submission.similarity_score, Some(1.0));
    }

    #[tokio::test]
    async fn low_score_gets_derived_suggestions() {
        let (orch, _) = orchestrator();
        let out = orch
            .submit(upload(1, "red", "blue"), &CancellationToken::new())
            .await
            .unwrap();
        assert_matches!(out.decision, ApprovalDecision::Manual(ManualReason::BelowThreshold { .. }));
        assert!(out.submission.is_pending());
        assert!(!out.submission.ai_suggestions.is_empty());
    }

    #[tokio::test]
    async fn cap_reached_goes_manual() {
        let (orch, _) = orchestrator();
        save_config(&orch, |c| c.max_auto_approvals = 1).await;

        let first = orch
            .submit(upload(1, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(first.decision.is_auto_approve());

        let second = orch
            .submit(upload(2, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();
        assert_matches!(
            second.decision,
            ApprovalDecision::Manual(ManualReason::AutoApprovalCapReached { max_auto_approvals: 1 })
        );
        assert!(second.submission.is_pending());
    }

    #[tokio::test]
    async fn resubmission_chains_and_preserves_first_row() {
        let (orch, store) = orchestrator();
        let first = orch
            .submit(upload(1, "red", "blue"), &CancellationToken::new())
            .await
            .unwrap()
            .submission;
        let second = orch
            .submit(upload(1, "red", "green"), &CancellationToken::new())
            .await
            .unwrap()
            .submission;

        assert_eq!(second.resubmission_count, 1);
        assert_eq!(second.previous_submission_id, Some(first.id));
        let stored_first = store.find_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored_first, first);

        let history = orch.history(second.id).await.unwrap();
        let ids: Vec<_> = history.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn stored_template_layout_used_when_not_inline() {
        let (orch, store) = orchestrator();
        store
            .put_layouts(LayoutOwner::Template, "tpl", &[uniform("green"), uniform("red")])
            .await
            .unwrap();

        let mut request = upload(2, "unused", "red");
        request.template_layout = None;
        let out = orch.submit(request, &CancellationToken::new()).await.unwrap();
        assert!((out.comparison.similarity - 1.0).abs() < 1e-9);

        let mut missing = upload(3, "unused", "red");
        missing.template_layout = None;
        assert_matches!(
            orch.submit(missing, &CancellationToken::new()).await,
            Err(PipelineError::Core(CoreError::NotFound { .. }))
        );
    }

    #[tokio::test]
    async fn cancelled_submit_persists_nothing() {
        let (orch, store) = orchestrator();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_matches!(
            orch.submit(upload(1, "red", "red"), &cancel).await,
            Err(PipelineError::Cancelled)
        );
        assert!(store.find_latest_for_slot("asg", "usr", 1).await.unwrap().is_none());
        assert_eq!(store.used("tpl").await.unwrap(), 0);
    }

    // -- store outages ---------------------------------------------------------

    #[tokio::test]
    async fn threshold_store_outage_leaves_submission_for_review() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator_over(store.clone(), Arc::new(DownStore), store.clone(), store.clone());

        let out = orch
            .submit(upload(1, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.degraded);
        assert_eq!(out.decision, ApprovalDecision::Manual(ManualReason::StoreUnavailable));
        assert!(out.submission.is_pending());
        assert_eq!(out.submission.similarity_score, Some(1.0));
        assert_eq!(store.used("tpl").await.unwrap(), 0);

        let stored = store.find_latest_for_slot("asg", "usr", 1).await.unwrap().unwrap();
        assert_eq!(stored.id, out.submission.id);
    }

    #[tokio::test]
    async fn counter_outage_leaves_submission_for_review() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator_over(store.clone(), store.clone(), Arc::new(DownStore), store.clone());

        let out = orch
            .submit(upload(1, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.degraded);
        assert_eq!(out.decision, ApprovalDecision::Manual(ManualReason::StoreUnavailable));
        assert!(out.submission.is_pending());
        assert!(out.submission.reviewed_by.is_none());
        assert!(store.find_latest_for_slot("asg", "usr", 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn layout_store_outage_never_auto_approves() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator_over(store.clone(), store.clone(), store.clone(), Arc::new(DownStore));
        // Low enough that the fallback score alone would qualify.
        save_config(&orch, |c| {
            c.custom_scene_thresholds.insert("1".into(), 0.05);
        })
        .await;

        let mut request = upload(1, "unused", "red");
        request.template_layout = None;
        let out = orch.submit(request, &CancellationToken::new()).await.unwrap();

        assert!(out.degraded);
        assert_eq!(out.decision, ApprovalDecision::Manual(ManualReason::StoreUnavailable));
        assert!((out.comparison.similarity - 0.1).abs() < 1e-9);
        assert!(out.submission.is_pending());
        assert_eq!(store.used("tpl").await.unwrap(), 0);
    }

    // -- review --------------------------------------------------------------

    #[tokio::test]
    async fn superseded_row_cannot_be_reviewed() {
        let (orch, _) = orchestrator();
        let first = orch
            .submit(upload(1, "red", "blue"), &CancellationToken::new())
            .await
            .unwrap()
            .submission;
        orch.submit(upload(1, "red", "blue"), &CancellationToken::new())
            .await
            .unwrap();

        assert_matches!(
            orch.approve(first.id, "mgr").await,
            Err(PipelineError::Core(CoreError::InvalidTransition(_)))
        );
    }

    #[tokio::test]
    async fn reject_then_approve() {
        let (orch, _) = orchestrator();
        let s = orch
            .submit(upload(1, "red", "blue"), &CancellationToken::new())
            .await
            .unwrap()
            .submission;

        let rejected = orch.reject(s.id, "mgr", "Wrong colour").await.unwrap();
        assert!(rejected.is_pending());
        assert_eq!(rejected.feedback, vec!["Wrong colour".to_string()]);

        let approved = orch.approve(s.id, "mgr").await.unwrap();
        assert_eq!(approved.status, SubmissionStatus::Approved);
    }

    #[tokio::test]
    async fn override_respects_template_setting() {
        let (orch, _) = orchestrator();
        let s = orch
            .submit(upload(1, "red", "blue"), &CancellationToken::new())
            .await
            .unwrap()
            .submission;

        let request = OverrideRequest {
            approved: true,
            reason: "Creative choice".into(),
            reviewer_id: "mgr".into(),
            manager_id: None,
        };

        save_config(&orch, |c| c.allow_manual_override = false).await;
        assert_matches!(
            orch.override_decision(s.id, &request).await,
            Err(PipelineError::Core(CoreError::Conflict(_)))
        );

        save_config(&orch, |c| c.allow_manual_override = true).await;
        let overridden = orch.override_decision(s.id, &request).await.unwrap();
        assert_eq!(overridden.status, SubmissionStatus::Approved);
        let meta = overridden.manual_override.unwrap();
        assert_eq!(meta.original_similarity_score, s.similarity_score);
    }

    #[tokio::test]
    async fn override_unknown_submission_is_not_found() {
        let (orch, _) = orchestrator();
        let request = OverrideRequest {
            approved: true,
            reason: "ok".into(),
            reviewer_id: "mgr".into(),
            manager_id: None,
        };
        assert_matches!(
            orch.override_decision(uuid::Uuid::now_v7(), &request).await,
            Err(PipelineError::Core(CoreError::NotFound { .. }))
        );
    }

    // -- queries / cascade ---------------------------------------------------

    #[tokio::test]
    async fn progress_counts_latest_per_scene() {
        let (orch, _) = orchestrator();
        let cancel = CancellationToken::new();
        orch.submit(upload(1, "red", "blue"), &cancel).await.unwrap();
        orch.submit(upload(1, "red", "red"), &cancel).await.unwrap();
        orch.submit(upload(2, "red", "blue"), &cancel).await.unwrap();

        let p = orch.progress("asg", "usr", 4).await.unwrap();
        assert_eq!(p.submitted_scenes, 2);
        assert_eq!(p.approved_scenes, 1);
        assert_eq!(p.pending_scenes, 1);
        assert_eq!(p.completion_percentage, 25.0);
    }

    #[tokio::test]
    async fn latest_for_slot_returns_chain_head() {
        let (orch, _) = orchestrator();
        let cancel = CancellationToken::new();
        orch.submit(upload(1, "red", "blue"), &cancel).await.unwrap();
        let head = orch
            .submit(upload(1, "red", "green"), &cancel)
            .await
            .unwrap()
            .submission;

        assert_eq!(orch.latest_for_slot("asg", "usr", 1).await.unwrap().id, head.id);
        assert_matches!(
            orch.latest_for_slot("asg", "usr", 2).await,
            Err(PipelineError::Core(CoreError::NotFound { .. }))
        );
        assert_eq!(orch.list_for_assignment_user("asg", "usr").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn template_cascade_resets_counter() {
        let (orch, store) = orchestrator();
        orch.submit(upload(1, "red", "red"), &CancellationToken::new())
            .await
            .unwrap();

        let deleted = orch.delete_template_submissions("tpl").await.unwrap();
        assert_eq!(deleted.deleted, 1);
        assert_eq!(store.used("tpl").await.unwrap(), 0);
        assert!(orch.pending(None).await.unwrap().is_empty());
    }
}
