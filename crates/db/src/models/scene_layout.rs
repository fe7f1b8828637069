//! Stored scene layouts.

use scenegate_core::grid::SceneLayout;
use scenegate_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `scene_layouts` table.
#[derive(Debug, Clone, FromRow)]
pub struct SceneLayoutRow {
    pub owner_kind: String,
    pub owner_id: String,
    pub scenes: Json<Vec<SceneLayout>>,
    pub updated_at: Timestamp,
}
