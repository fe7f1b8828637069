//! Repository for the `scene_layouts` table.

use scenegate_core::grid::SceneLayout;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::scene_layout::SceneLayoutRow;

const COLUMNS: &str = "owner_kind, owner_id, scenes, updated_at";

pub struct SceneLayoutRepo;

impl SceneLayoutRepo {
    /// Replace the layout list for an owner.
    pub async fn upsert(
        pool: &PgPool,
        owner_kind: &str,
        owner_id: &str,
        scenes: &[SceneLayout],
    ) -> Result<SceneLayoutRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO scene_layouts (owner_kind, owner_id, scenes)
             VALUES ($1, $2, $3)
             ON CONFLICT (owner_kind, owner_id)
             DO UPDATE SET scenes = EXCLUDED.scenes, updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SceneLayoutRow>(&query)
            .bind(owner_kind)
            .bind(owner_id)
            .bind(Json(scenes))
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        owner_kind: &str,
        owner_id: &str,
    ) -> Result<Option<SceneLayoutRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scene_layouts WHERE owner_kind = $1 AND owner_id = $2"
        );
        sqlx::query_as::<_, SceneLayoutRow>(&query)
            .bind(owner_kind)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }
}
