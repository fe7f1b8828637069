use axum::routing::put;
use axum::Router;

use crate::handlers::layout;
use crate::state::AppState;

/// Layout routes mounted at `/layouts`.
///
/// ```text
/// PUT    /{owner_kind}/{owner_id}    -> put_layouts
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{owner_kind}/{owner_id}", put(layout::put_layouts))
}
