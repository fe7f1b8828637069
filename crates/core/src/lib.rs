//! Pure domain logic for scene submission scoring and approval.
//!
//! Nothing in this crate performs I/O. Vector comparison, grid scoring,
//! scene aggregation, threshold resolution and the submission lifecycle
//! are all plain functions and value types so the pipeline and API layers
//! can compose them freely.

pub mod aggregate;
pub mod approval;
pub mod error;
pub mod fallback;
pub mod grid;
pub mod report;
pub mod similarity;
pub mod submission;
pub mod types;
