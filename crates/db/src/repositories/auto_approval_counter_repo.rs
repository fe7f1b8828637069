//! Repository for the `auto_approval_counters` table.

use sqlx::PgPool;

pub struct AutoApprovalCounterRepo;

impl AutoApprovalCounterRepo {
    pub async fn used(pool: &PgPool, template_id: &str) -> Result<i32, sqlx::Error> {
        let used = sqlx::query_scalar::<_, i32>(
            "SELECT approvals FROM auto_approval_counters WHERE template_id = $1",
        )
        .bind(template_id)
        .fetch_optional(pool)
        .await?;
        Ok(used.unwrap_or(0))
    }

    /// Claim one auto-approval slot in a single statement.
    ///
    /// The conditional upsert only bumps the counter while it is below
    /// `max`, so concurrent callers can never exceed the cap. Returns the new
    /// count, or `None` if the cap was already reached.
    pub async fn try_increment(
        pool: &PgPool,
        template_id: &str,
        max: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "INSERT INTO auto_approval_counters (template_id, approvals)
             SELECT $1, 1 WHERE $2 > 0
             ON CONFLICT (template_id) DO UPDATE
                SET approvals = auto_approval_counters.approvals + 1,
                    updated_at = NOW()
                WHERE auto_approval_counters.approvals < $2
             RETURNING approvals",
        )
        .bind(template_id)
        .bind(max)
        .fetch_optional(pool)
        .await
    }

    pub async fn decrement(pool: &PgPool, template_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE auto_approval_counters
             SET approvals = approvals - 1, updated_at = NOW()
             WHERE template_id = $1 AND approvals > 0",
        )
        .bind(template_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, template_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM auto_approval_counters WHERE template_id = $1")
            .bind(template_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
