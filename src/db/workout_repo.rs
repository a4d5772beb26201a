use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use liftlog_core::Workout;

use super::DbError;

/// Cached workout history, most recent first.
pub struct WorkoutRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct WorkoutRow {
    id: String,
    name: String,
    date: String,
    duration: i64,
    notes: String,
    exercises: String,
}

impl WorkoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Workout>, DbError> {
        let rows: Vec<WorkoutRow> = sqlx::query_as(
            "SELECT id, name, date, duration, notes, exercises FROM workouts ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut workouts = Vec::with_capacity(rows.len());
        for row in rows {
            // A row we can't read shouldn't hide the rest of the history
            let date = match DateTime::parse_from_rfc3339(&row.date) {
                Ok(date) => date.with_timezone(&Utc),
                Err(e) => {
                    tracing::warn!("Skipping cached workout {}: bad date: {}", row.id, e);
                    continue;
                }
            };
            workouts.push(Workout {
                id: row.id,
                name: row.name,
                date,
                exercises: serde_json::from_str(&row.exercises)?,
                duration: u32::try_from(row.duration).unwrap_or(0),
                notes: row.notes,
            });
        }
        Ok(workouts)
    }

    /// Replaces the cached history with `workouts`, keeping their order.
    pub async fn replace_all(&self, workouts: &[Workout]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM workouts").execute(&mut *tx).await?;
        for (position, workout) in workouts.iter().enumerate() {
            let exercises = serde_json::to_string(&workout.exercises)?;
            sqlx::query(
                r#"
                INSERT INTO workouts (id, position, name, date, duration, notes, exercises)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&workout.id)
            .bind(position as i64)
            .bind(&workout.name)
            .bind(workout.date.to_rfc3339())
            .bind(i64::from(workout.duration))
            .bind(&workout.notes)
            .bind(&exercises)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
