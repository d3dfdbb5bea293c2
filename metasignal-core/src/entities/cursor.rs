use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone)]
/// Get the last processed block of a pool.
pub struct GetPoolCursor {
    pub pool_address: String,
}

impl Processor<GetPoolCursor> for DatabaseProcessor {
    type Output = Option<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPoolCursor")]
    async fn process(&self, query: GetPoolCursor) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT last_block
            FROM pool_cursors
            WHERE pool_address = $1
            "#,
        )
        .bind(query.pool_address)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Upsert a pool cursor without ever moving it backwards.
///
/// Returns the stored block after the write.
pub struct AdvancePoolCursor {
    pub pool_address: String,
    pub last_block: i64,
}

impl Processor<AdvancePoolCursor> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:AdvancePoolCursor")]
    async fn process(&self, cmd: AdvancePoolCursor) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pool_cursors (pool_address, last_block)
            VALUES ($1, $2)
            ON CONFLICT (pool_address) DO UPDATE
            SET last_block = GREATEST(pool_cursors.last_block, EXCLUDED.last_block),
                updated_at = NOW()
            RETURNING last_block
            "#,
        )
        .bind(cmd.pool_address)
        .bind(cmd.last_block)
        .fetch_one(&self.pool)
        .await
    }
}
