use kanau::processor::Processor;
use sqlx::PgPool;

/// Executes the `kanau` query objects defined in [`crate::entities`]
/// against a Postgres pool.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

/// Round trip to the database.
#[derive(Debug, Clone, Copy)]
pub struct Ping;

impl Processor<Ping> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:Ping")]
    async fn process(&self, _: Ping) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
