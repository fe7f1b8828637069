//! Scene submission lifecycle.
//!
//! A row is `Pending` until a reviewer (human or the auto-approval chain)
//! approves it. Rejection keeps the row `Pending` with feedback attached;
//! the creator is expected to resubmit, which produces a new row chained to
//! the old one. Superseded rows are never mutated again; enforcing that
//! needs the store (only it knows whether a newer row exists), so the
//! transition methods here only check status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::approval::SYSTEM_REVIEWER;
use crate::error::CoreError;
use crate::types::{SubmissionId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            other => Err(CoreError::Validation(format!(
                "Unknown submission status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Override metadata
// ---------------------------------------------------------------------------

/// Audit record attached when a reviewer overrides the automatic decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverride {
    pub reason: String,
    pub override_by: String,
    pub override_at: Timestamp,
    pub original_similarity_score: Option<f64>,
}

// ---------------------------------------------------------------------------
// SceneSubmission
// ---------------------------------------------------------------------------

/// Input for a fresh upload to a scene slot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSceneSubmission {
    pub template_id: String,
    pub assignment_id: String,
    pub user_id: String,
    pub scene_number: i32,
    #[serde(default)]
    pub scene_title: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl NewSceneSubmission {
    pub fn validate(&self) -> Result<(), CoreError> {
        for (value, name) in [
            (&self.template_id, "Template ID"),
            (&self.assignment_id, "Assignment ID"),
            (&self.user_id, "User ID"),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{name} is required")));
            }
        }
        if self.scene_number < 1 {
            return Err(CoreError::Validation(format!(
                "Scene number must be positive, got {}",
                self.scene_number
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSubmission {
    pub id: SubmissionId,
    pub template_id: String,
    pub assignment_id: String,
    pub user_id: String,
    pub scene_number: i32,
    pub scene_title: Option<String>,
    pub video_url: Option<String>,
    pub status: SubmissionStatus,
    pub similarity_score: Option<f64>,
    pub feedback: Vec<String>,
    pub ai_suggestions: Vec<String>,
    pub resubmission_count: i32,
    pub previous_submission_id: Option<SubmissionId>,
    /// Ids of every earlier row in the chain, oldest first.
    pub resubmission_history: Vec<SubmissionId>,
    pub submitted_at: Timestamp,
    pub last_updated_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<String>,
    pub manual_override: Option<ManualOverride>,
}

impl SceneSubmission {
    /// First upload for a slot.
    pub fn new(input: NewSceneSubmission, now: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            template_id: input.template_id,
            assignment_id: input.assignment_id,
            user_id: input.user_id,
            scene_number: input.scene_number,
            scene_title: input.scene_title,
            video_url: input.video_url,
            status: SubmissionStatus::Pending,
            similarity_score: None,
            feedback: Vec::new(),
            ai_suggestions: Vec::new(),
            resubmission_count: 0,
            previous_submission_id: None,
            resubmission_history: Vec::new(),
            submitted_at: now,
            last_updated_at: now,
            reviewed_at: None,
            reviewed_by: None,
            manual_override: None,
        }
    }

    /// Build the row that supersedes `self`. `self` is left untouched.
    pub fn resubmit(&self, input: NewSceneSubmission, now: Timestamp) -> Result<Self, CoreError> {
        if !self.same_slot(&input) {
            return Err(CoreError::Validation(format!(
                "Resubmission must target the same scene slot as submission {}",
                self.id
            )));
        }

        let mut history = self.resubmission_history.clone();
        history.push(self.id);

        let mut next = Self::new(input, now);
        next.previous_submission_id = Some(self.id);
        next.resubmission_count = history.len() as i32;
        next.resubmission_history = history;
        Ok(next)
    }

    /// Identifier used for per-scene threshold lookups.
    pub fn scene_id(&self) -> String {
        self.scene_number.to_string()
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }

    pub fn same_slot(&self, input: &NewSceneSubmission) -> bool {
        self.template_id == input.template_id
            && self.assignment_id == input.assignment_id
            && self.user_id == input.user_id
            && self.scene_number == input.scene_number
    }

    fn require_pending(&self, action: &str) -> Result<(), CoreError> {
        if !self.is_pending() {
            return Err(CoreError::InvalidTransition(format!(
                "Cannot {action} submission {}: status is {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Record the score and any suggestions from a scoring run.
    pub fn record_score(&mut self, score: f64, suggestions: Vec<String>, now: Timestamp) {
        self.similarity_score = Some(score);
        self.ai_suggestions = suggestions;
        self.last_updated_at = now;
    }

    pub fn approve(&mut self, reviewer_id: &str, now: Timestamp) -> Result<(), CoreError> {
        self.require_pending("approve")?;
        if reviewer_id.trim().is_empty() {
            return Err(CoreError::Validation("Reviewer ID is required".to_string()));
        }
        self.status = SubmissionStatus::Approved;
        self.reviewed_by = Some(reviewer_id.to_string());
        self.reviewed_at = Some(now);
        self.last_updated_at = now;
        Ok(())
    }

    /// Approve on behalf of the auto-approval chain.
    pub fn auto_approve(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.approve(SYSTEM_REVIEWER, now)
    }

    /// Status stays `Pending`; the creator is expected to resubmit.
    pub fn reject(&mut self, reviewer_id: &str, feedback: &str, now: Timestamp) -> Result<(), CoreError> {
        self.require_pending("reject")?;
        if reviewer_id.trim().is_empty() {
            return Err(CoreError::Validation("Reviewer ID is required".to_string()));
        }
        if feedback.trim().is_empty() {
            return Err(CoreError::Validation(
                "Feedback is required when rejecting a submission".to_string(),
            ));
        }
        self.feedback.push(feedback.trim().to_string());
        self.reviewed_by = Some(reviewer_id.to_string());
        self.reviewed_at = Some(now);
        self.last_updated_at = now;
        Ok(())
    }

    /// Apply a manual override. Approval records override metadata; a
    /// negative override behaves like [`reject`](Self::reject) with the
    /// reason as feedback.
    pub fn apply_override(
        &mut self,
        approved: bool,
        reason: &str,
        reviewer_id: &str,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::Validation(
                "Reason is required for manual override".to_string(),
            ));
        }
        if !approved {
            return self.reject(reviewer_id, reason, now);
        }

        self.approve(reviewer_id, now)?;
        self.manual_override = Some(ManualOverride {
            reason: reason.trim().to_string(),
            override_by: reviewer_id.to_string(),
            override_at: now,
            original_similarity_score: self.similarity_score,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per (assignment, user) completion summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionProgress {
    pub total_scenes: usize,
    pub submitted_scenes: usize,
    pub approved_scenes: usize,
    pub pending_scenes: usize,
    pub completion_percentage: f64,
}

/// Summarise the latest row of each slot.
///
/// `latest` must hold at most one row per scene number.
pub fn summarize_progress(latest: &[SceneSubmission], total_scenes: usize) -> SubmissionProgress {
    let approved = latest
        .iter()
        .filter(|s| s.status == SubmissionStatus::Approved)
        .count();
    let pending = latest.iter().filter(|s| s.is_pending()).count();
    let completion_percentage = if total_scenes == 0 {
        0.0
    } else {
        approved as f64 / total_scenes as f64 * 100.0
    };

    SubmissionProgress {
        total_scenes,
        submitted_scenes: latest.len(),
        approved_scenes: approved,
        pending_scenes: pending,
        completion_percentage,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
