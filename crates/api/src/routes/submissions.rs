//! Route definitions for scene submissions.
//!
//! Two routers are provided:
//! - `router()` for per-submission routes mounted at `/submissions`
//! - `assignment_router()` for per-creator queries mounted at `/assignments`

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::submission;
use crate::state::AppState;

/// Submission routes mounted at `/submissions`.
///
/// ```text
/// POST   /                 -> submit
/// GET    /pending          -> list_pending
/// GET    /{id}             -> get_submission
/// GET    /{id}/history     -> get_history
/// POST   /{id}/approve     -> approve
/// POST   /{id}/reject      -> reject
/// POST   /{id}/override    -> override_decision
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submission::submit))
        .route("/pending", get(submission::list_pending))
        .route("/{id}", get(submission::get_submission))
        .route("/{id}/history", get(submission::get_history))
        .route("/{id}/approve", post(submission::approve))
        .route("/{id}/reject", post(submission::reject))
        .route("/{id}/override", post(submission::override_decision))
}

/// Per-creator routes mounted at `/assignments`.
///
/// ```text
/// GET    /{assignment_id}/users/{user_id}/submissions                  -> list_for_assignment_user
/// GET    /{assignment_id}/users/{user_id}/scenes/{scene_number}/latest -> latest_for_slot
/// GET    /{assignment_id}/users/{user_id}/progress                     -> get_progress
/// ```
pub fn assignment_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{assignment_id}/users/{user_id}/submissions",
            get(submission::list_for_assignment_user),
        )
        .route(
            "/{assignment_id}/users/{user_id}/scenes/{scene_number}/latest",
            get(submission::latest_for_slot),
        )
        .route(
            "/{assignment_id}/users/{user_id}/progress",
            get(submission::get_progress),
        )
}
