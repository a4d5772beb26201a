use sqlx::SqlitePool;

use liftlog_core::{Exercise, Routine};

use super::DbError;

/// Cached exercise and routine collections, kept in catalog order.
pub struct CatalogRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    id: String,
    name: String,
    category: String,
    notes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct RoutineRow {
    id: String,
    name: String,
    exercise_ids: String,
    notes: Option<String>,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_exercises(&self) -> Result<Vec<Exercise>, DbError> {
        let rows: Vec<ExerciseRow> = sqlx::query_as(
            "SELECT id, name, category, notes FROM exercises ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Exercise {
                id: row.id,
                name: row.name,
                category: row.category,
                notes: row.notes,
            })
            .collect())
    }

    pub async fn list_routines(&self) -> Result<Vec<Routine>, DbError> {
        let rows: Vec<RoutineRow> = sqlx::query_as(
            "SELECT id, name, exercise_ids, notes FROM routines ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Routine {
                    id: row.id,
                    name: row.name,
                    exercise_ids: serde_json::from_str(&row.exercise_ids)?,
                    notes: row.notes,
                })
            })
            .collect()
    }

    /// Replaces the cached exercises with `exercises`, in order.
    pub async fn replace_exercises(&self, exercises: &[Exercise]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM exercises").execute(&mut *tx).await?;
        for (position, exercise) in exercises.iter().enumerate() {
            sqlx::query(
                "INSERT INTO exercises (id, position, name, category, notes) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&exercise.id)
            .bind(position as i64)
            .bind(&exercise.name)
            .bind(&exercise.category)
            .bind(&exercise.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replaces the cached routines with `routines`, in order.
    pub async fn replace_routines(&self, routines: &[Routine]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM routines").execute(&mut *tx).await?;
        for (position, routine) in routines.iter().enumerate() {
            let exercise_ids = serde_json::to_string(&routine.exercise_ids)?;
            sqlx::query(
                "INSERT INTO routines (id, position, name, exercise_ids, notes) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&routine.id)
            .bind(position as i64)
            .bind(&routine.name)
            .bind(&exercise_ids)
            .bind(&routine.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
