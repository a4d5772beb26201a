use sqlx::SqlitePool;

use liftlog_core::PendingWrite;

use super::DbError;

/// Writes waiting to be pushed to the sync server, in push order.
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<PendingWrite>, DbError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT payload FROM outbox ORDER BY seq")
            .fetch_all(&self.pool)
            .await?;

        let mut writes = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            writes.push(serde_json::from_str(&payload)?);
        }
        Ok(writes)
    }

    pub async fn replace_all<'a, I>(&self, writes: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = &'a PendingWrite>,
    {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM outbox").execute(&mut *tx).await?;
        for write in writes {
            let payload = serde_json::to_string(write)?;
            sqlx::query("INSERT INTO outbox (payload) VALUES (?)")
                .bind(&payload)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
