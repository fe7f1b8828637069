use axum::routing::post;
use axum::Router;

use crate::handlers::comparison;
use crate::state::AppState;

/// Comparison routes mounted at `/comparisons`.
///
/// ```text
/// POST   /                            -> compare_layouts
/// POST   /{template_id}/{video_id}    -> compare_stored
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(comparison::compare_layouts))
        .route("/{template_id}/{video_id}", post(comparison::compare_stored))
}
