pub mod comparisons;
pub mod health;
pub mod layouts;
pub mod submissions;
pub mod thresholds;

use axum::routing::delete;
use axum::Router;

use crate::handlers::submission;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /comparisons                                         compare explicit layouts (POST)
/// /comparisons/{template_id}/{video_id}                compare stored layouts (POST)
///
/// /layouts/{owner_kind}/{owner_id}                     store layouts (PUT)
///
/// /submissions                                         upload, score, decide (POST)
/// /submissions/pending                                 review queue (GET)
/// /submissions/{id}                                    get
/// /submissions/{id}/history                            resubmission chain (GET)
/// /submissions/{id}/approve                            approve (POST)
/// /submissions/{id}/reject                             reject with feedback (POST)
/// /submissions/{id}/override                           manual override (POST)
///
/// /assignments/{a}/users/{u}/submissions               all rows (GET)
/// /assignments/{a}/users/{u}/scenes/{n}/latest         chain head (GET)
/// /assignments/{a}/users/{u}/progress                  completion summary (GET)
///
/// /thresholds                                          upsert (PUT)
/// /thresholds/effective                                effective threshold (GET)
/// /thresholds/{id}                                     get by template id, delete by row id
///
/// /managers/{manager_id}/thresholds                    list (GET)
/// /managers/{manager_id}/analytics                     analytics (GET)
///
/// /templates/{template_id}/submissions                 cascade delete (DELETE)
/// /users/{user_id}/submissions                         cascade delete (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/comparisons", comparisons::router())
        .nest("/layouts", layouts::router())
        .nest("/submissions", submissions::router())
        .nest("/assignments", submissions::assignment_router())
        .nest("/thresholds", thresholds::router())
        .nest("/managers", thresholds::manager_router())
        .route(
            "/templates/{template_id}/submissions",
            delete(submission::delete_template_submissions),
        )
        .route(
            "/users/{user_id}/submissions",
            delete(submission::delete_user_submissions),
        )
}
