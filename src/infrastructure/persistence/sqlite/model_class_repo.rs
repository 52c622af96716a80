//! SQLite Model Class Repository

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{ModelClass, ModelClassRepositoryPort, RepositoryError};

pub struct SqliteModelClassRepository {
    pool: DbPool,
}

impl SqliteModelClassRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ClassRow {
    model_id: i64,
    code: String,
    name: String,
}

impl From<ClassRow> for ModelClass {
    fn from(row: ClassRow) -> Self {
        ModelClass {
            model_id: row.model_id,
            code: row.code,
            name: row.name,
        }
    }
}

#[async_trait]
impl ModelClassRepositoryPort for SqliteModelClassRepository {
    async fn save(&self, class: &ModelClass) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO model_classes (model_id, code, name) VALUES (?, ?, ?)
            ON CONFLICT(model_id, code) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(class.model_id)
        .bind(&class.code)
        .bind(&class.name)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn class_map(&self, model_id: i64) -> Result<HashMap<String, ModelClass>, RepositoryError> {
        let rows: Vec<ClassRow> =
            sqlx::query_as("SELECT model_id, code, name FROM model_classes WHERE model_id = ?")
                .bind(model_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.code.clone(), ModelClass::from(row)))
            .collect())
    }
}
