//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. [`crate::PgStore`] adapts them
//! to the store traits.

pub mod approval_threshold_repo;
pub mod auto_approval_counter_repo;
pub mod scene_layout_repo;
pub mod scene_submission_repo;

pub use approval_threshold_repo::ApprovalThresholdRepo;
pub use auto_approval_counter_repo::AutoApprovalCounterRepo;
pub use scene_layout_repo::SceneLayoutRepo;
pub use scene_submission_repo::SceneSubmissionRepo;
