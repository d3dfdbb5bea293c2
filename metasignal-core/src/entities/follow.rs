use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone)]
/// Get the subscribers following an actor.
pub struct GetFollowersOf {
    pub actor: String,
}

impl Processor<GetFollowersOf> for DatabaseProcessor {
    type Output = Vec<String>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetFollowersOf")]
    async fn process(&self, query: GetFollowersOf) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT subscriber
            FROM follows
            WHERE actor = $1
            "#,
        )
        .bind(query.actor)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Get the actors a subscriber follows, sorted.
pub struct GetFollowsOf {
    pub subscriber: String,
}

impl Processor<GetFollowsOf> for DatabaseProcessor {
    type Output = Vec<String>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetFollowsOf")]
    async fn process(&self, query: GetFollowsOf) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT actor
            FROM follows
            WHERE subscriber = $1
            ORDER BY actor ASC
            "#,
        )
        .bind(query.subscriber)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Register a subscriber address.
///
/// Returns `true` if a new row was created.
pub struct InsertSubscriber {
    pub address: String,
}

impl Processor<InsertSubscriber> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertSubscriber")]
    async fn process(&self, cmd: InsertSubscriber) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscribers (address)
            VALUES ($1)
            ON CONFLICT (address) DO NOTHING
            "#,
        )
        .bind(cmd.address)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Check whether a subscriber address is registered.
pub struct SubscriberExists {
    pub address: String,
}

impl Processor<SubscriberExists> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SubscriberExists")]
    async fn process(&self, query: SubscriberExists) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM subscribers WHERE address = $1)
            "#,
        )
        .bind(query.address)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Add a follow edge. Existing edges are left untouched.
pub struct InsertFollow {
    pub subscriber: String,
    pub actor: String,
}

impl Processor<InsertFollow> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertFollow")]
    async fn process(&self, cmd: InsertFollow) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO follows (subscriber, actor)
            VALUES ($1, $2)
            ON CONFLICT (subscriber, actor) DO NOTHING
            "#,
        )
        .bind(cmd.subscriber)
        .bind(cmd.actor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Remove a follow edge.
pub struct DeleteFollow {
    pub subscriber: String,
    pub actor: String,
}

impl Processor<DeleteFollow> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteFollow")]
    async fn process(&self, cmd: DeleteFollow) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM follows
            WHERE subscriber = $1 AND actor = $2
            "#,
        )
        .bind(cmd.subscriber)
        .bind(cmd.actor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
