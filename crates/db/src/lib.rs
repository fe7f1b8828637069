//! Persistence for scene submissions, approval thresholds, auto-approval
//! counters and scene layouts.
//!
//! The store traits in [`store`] are what the pipeline depends on. Two
//! implementations exist: [`PgStore`] over PostgreSQL and [`MemoryStore`]
//! for tests and local development.

pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod store;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use sqlx::PgPool as DbPool;
pub use store::{AutoApprovalCounter, LayoutOwner, LayoutStore, StoreError, SubmissionStore, ThresholdStore};

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
