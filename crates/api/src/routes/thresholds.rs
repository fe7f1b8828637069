use axum::routing::{get, put};
use axum::Router;

use crate::handlers::threshold;
use crate::state::AppState;

/// Threshold routes mounted at `/thresholds`.
///
/// `GET /{id}` takes a template id; `DELETE /{id}` takes the row id.
///
/// ```text
/// PUT    /             -> upsert_threshold
/// GET    /effective    -> get_effective
/// GET    /{id}         -> get_for_template
/// DELETE /{id}         -> delete_threshold
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", put(threshold::upsert_threshold))
        .route("/effective", get(threshold::get_effective))
        .route(
            "/{id}",
            get(threshold::get_for_template).delete(threshold::delete_threshold),
        )
}

/// Manager routes mounted at `/managers`.
///
/// ```text
/// GET    /{manager_id}/thresholds    -> list_for_manager
/// GET    /{manager_id}/analytics     -> get_analytics
/// ```
pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/{manager_id}/thresholds", get(threshold::list_for_manager))
        .route("/{manager_id}/analytics", get(threshold::get_analytics))
}
