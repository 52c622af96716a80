//! SQLite Model Run Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{
    ModelDatasetResult, ModelRunRecord, ModelRunRepositoryPort, RepositoryError,
};

/// SQLite Model Run Repository
pub struct SqliteModelRunRepository {
    pool: DbPool,
}

impl SqliteModelRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
        .with_timezone(&Utc))
}

#[derive(FromRow)]
struct RunRow {
    id: i64,
    model_id: i64,
    model_serial_no: i64,
    dataset_id: i64,
    created_at: String,
}

impl TryFrom<RunRow> for ModelRunRecord {
    type Error = RepositoryError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(ModelRunRecord {
            id: row.id,
            model_id: row.model_id,
            model_serial_no: row.model_serial_no,
            dataset_id: row.dataset_id,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct ResultRow {
    model_id: i64,
    model_serial_no: i64,
    data_id: i64,
    dataset_id: i64,
    result_filter_param: Option<String>,
    model_result: String,
    is_success: bool,
    error_message: Option<String>,
    updated_at: String,
}

impl TryFrom<ResultRow> for ModelDatasetResult {
    type Error = RepositoryError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let result_filter_param = row
            .result_filter_param
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        Ok(ModelDatasetResult {
            model_id: row.model_id,
            model_serial_no: row.model_serial_no,
            data_id: row.data_id,
            dataset_id: row.dataset_id,
            result_filter_param,
            model_result: serde_json::from_str(&row.model_result)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            is_success: row.is_success,
            error_message: row.error_message,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl ModelRunRepositoryPort for SqliteModelRunRepository {
    async fn create_run(
        &self,
        model_id: i64,
        model_serial_no: i64,
        dataset_id: i64,
    ) -> Result<ModelRunRecord, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO model_run_records (model_id, model_serial_no, dataset_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(model_id)
        .bind(model_serial_no)
        .bind(dataset_id)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(ModelRunRecord {
            id: result.last_insert_rowid(),
            model_id,
            model_serial_no,
            dataset_id,
            created_at,
        })
    }

    async fn find_by_serial_no(&self, model_serial_no: i64) -> Result<Option<ModelRunRecord>, RepositoryError> {
        let row: Option<RunRow> = sqlx::query_as(
            "SELECT id, model_id, model_serial_no, dataset_id, created_at FROM model_run_records WHERE model_serial_no = ?",
        )
        .bind(model_serial_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ModelRunRecord::try_from).transpose()
    }

    async fn save_dataset_result(&self, result: &ModelDatasetResult) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO model_dataset_results
                (model_serial_no, data_id, model_id, dataset_id, result_filter_param, model_result, is_success, error_message, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(model_serial_no, data_id) DO UPDATE SET
                result_filter_param = excluded.result_filter_param,
                model_result = excluded.model_result,
                is_success = excluded.is_success,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(result.model_serial_no)
        .bind(result.data_id)
        .bind(result.model_id)
        .bind(result.dataset_id)
        .bind(result.result_filter_param.as_ref().map(|v| v.to_string()))
        .bind(result.model_result.to_string())
        .bind(result.is_success)
        .bind(&result.error_message)
        .bind(result.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_dataset_results(&self, model_serial_no: i64) -> Result<Vec<ModelDatasetResult>, RepositoryError> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            r#"
            SELECT model_id, model_serial_no, data_id, dataset_id, result_filter_param, model_result,
                   is_success, error_message, updated_at
            FROM model_dataset_results WHERE model_serial_no = ? ORDER BY data_id
            "#,
        )
        .bind(model_serial_no)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ModelDatasetResult::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::test_pool;
    use serde_json::json;

    fn result(data_id: i64, is_success: bool) -> ModelDatasetResult {
        ModelDatasetResult {
            model_id: 2,
            model_serial_no: 9001,
            data_id,
            dataset_id: 5,
            result_filter_param: Some(json!({"minConfidence": 0.5})),
            model_result: json!({"code": if is_success { "SUCCESS" } else { "FAILURE" }}),
            is_success,
            error_message: (!is_success).then(|| "boom".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_run() {
        let repo = SqliteModelRunRepository::new(test_pool().await);
        let created = repo.create_run(2, 9001, 5).await.unwrap();
        assert!(created.id > 0);

        let found = repo.find_by_serial_no(9001).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.dataset_id, 5);
        assert!(repo.find_by_serial_no(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_serial_no_is_rejected() {
        let repo = SqliteModelRunRepository::new(test_pool().await);
        repo.create_run(2, 9001, 5).await.unwrap();
        assert!(matches!(
            repo.create_run(2, 9001, 5).await,
            Err(RepositoryError::DatabaseError(_))
        ));
    }

    #[tokio::test]
    async fn test_dataset_result_upsert() {
        let repo = SqliteModelRunRepository::new(test_pool().await);
        repo.save_dataset_result(&result(11, false)).await.unwrap();
        repo.save_dataset_result(&result(11, true)).await.unwrap();
        repo.save_dataset_result(&result(12, true)).await.unwrap();

        let results = repo.find_dataset_results(9001).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success);
        assert_eq!(results[0].error_message, None);
        assert_eq!(results[0].result_filter_param, Some(json!({"minConfidence": 0.5})));
        assert_eq!(results[1].data_id, 12);
    }
}
