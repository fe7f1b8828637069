//! Store traits consumed by the decision pipeline.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use scenegate_core::approval::ApprovalThreshold;
use scenegate_core::grid::SceneLayout;
use scenegate_core::submission::SceneSubmission;
use scenegate_core::types::SubmissionId;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Map a unique violation to [`StoreError::Conflict`], anything else to
/// [`StoreError::Database`].
pub(crate) fn classify(err: sqlx::Error, conflict_message: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict(conflict_message());
        }
    }
    StoreError::Database(err)
}

// ---------------------------------------------------------------------------
// Layout owners
// ---------------------------------------------------------------------------

/// Which side of a comparison a stored layout list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutOwner {
    Template,
    Video,
}

impl LayoutOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for LayoutOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutOwner {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template" => Ok(Self::Template),
            "video" => Ok(Self::Video),
            other => Err(StoreError::InvalidData(format!("Unknown layout owner '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new row. Fails with `Conflict` if `previous_submission_id`
    /// already has a successor.
    async fn insert(&self, submission: &SceneSubmission) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: SubmissionId) -> Result<Option<SceneSubmission>, StoreError>;

    /// Rows with the given ids, in no particular order. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[SubmissionId]) -> Result<Vec<SceneSubmission>, StoreError>;

    /// Most recent row for `(assignment, user, scene)`.
    async fn find_latest_for_slot(
        &self,
        assignment_id: &str,
        user_id: &str,
        scene_number: i32,
    ) -> Result<Option<SceneSubmission>, StoreError>;

    /// Every row for `(assignment, user)`, ordered by scene then submission time.
    async fn list_for_assignment_user(
        &self,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SceneSubmission>, StoreError>;

    /// Pending rows that have not been superseded, oldest first.
    async fn list_pending(&self, limit: i64) -> Result<Vec<SceneSubmission>, StoreError>;

    async fn is_superseded(&self, id: SubmissionId) -> Result<bool, StoreError>;

    /// Overwrite a row's mutable fields. Fails with `NotFound` if absent and
    /// `Conflict` if the row has been superseded.
    async fn update(&self, submission: &SceneSubmission) -> Result<(), StoreError>;

    /// Delete every row for a template. Returns the number removed.
    async fn delete_by_template(&self, template_id: &str) -> Result<u64, StoreError>;

    /// Delete every row for a user. Returns the number removed.
    async fn delete_by_user(&self, user_id: &str) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// Exact lookup; `manager_id = None` matches only the template-wide row.
    async fn find(
        &self,
        template_id: &str,
        manager_id: Option<&str>,
    ) -> Result<Option<ApprovalThreshold>, StoreError>;

    /// Insert or replace the row for `(template_id, manager_id)`, returning it
    /// with its id assigned.
    async fn upsert(&self, threshold: &ApprovalThreshold) -> Result<ApprovalThreshold, StoreError>;

    /// Returns `true` if a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_for_manager(&self, manager_id: &str) -> Result<Vec<ApprovalThreshold>, StoreError>;
}

/// Per-template count of automatic approvals.
#[async_trait]
pub trait AutoApprovalCounter: Send + Sync {
    async fn used(&self, template_id: &str) -> Result<u32, StoreError>;

    /// Atomically claim one slot if fewer than `max` have been used.
    async fn try_acquire(&self, template_id: &str, max: u32) -> Result<bool, StoreError>;

    /// Give back a slot claimed by [`try_acquire`](Self::try_acquire).
    async fn release(&self, template_id: &str) -> Result<(), StoreError>;

    async fn reset(&self, template_id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LayoutStore: Send + Sync {
    async fn put_layouts(
        &self,
        owner: LayoutOwner,
        owner_id: &str,
        scenes: &[SceneLayout],
    ) -> Result<(), StoreError>;

    async fn get_layouts(
        &self,
        owner: LayoutOwner,
        owner_id: &str,
    ) -> Result<Option<Vec<SceneLayout>>, StoreError>;
}
