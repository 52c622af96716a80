//! SQLite Annotation Store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{AnnotationStorePort, RepositoryError};
use crate::domain::annotation::{AnnotationObject, SourceType};

/// SQLite Annotation Store
pub struct SqliteAnnotationStore {
    pool: DbPool,
}

impl SqliteAnnotationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AnnotationRow {
    dataset_id: i64,
    data_id: i64,
    class_attributes: String,
    source_type: String,
    source_id: i64,
    dedup_key: String,
    created_at: String,
}

impl TryFrom<AnnotationRow> for AnnotationObject {
    type Error = RepositoryError;

    fn try_from(row: AnnotationRow) -> Result<Self, Self::Error> {
        Ok(AnnotationObject {
            dataset_id: row.dataset_id,
            data_id: row.data_id,
            class_attributes: serde_json::from_str(&row.class_attributes)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            source_type: SourceType::from_str(&row.source_type).ok_or_else(|| {
                RepositoryError::SerializationError(format!("unknown source type {}", row.source_type))
            })?,
            source_id: row.source_id,
            dedup_key: row.dedup_key,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl AnnotationStorePort for SqliteAnnotationStore {
    async fn save_batch(&self, objects: &[AnnotationObject]) -> Result<usize, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let mut inserted = 0u64;
        for object in objects {
            let result = sqlx::query(
                r#"
                INSERT INTO annotation_objects
                    (dataset_id, data_id, class_attributes, source_type, source_id, dedup_key, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(dedup_key) DO NOTHING
                "#,
            )
            .bind(object.dataset_id)
            .bind(object.data_id)
            .bind(object.class_attributes.to_string())
            .bind(object.source_type.as_str())
            .bind(object.source_id)
            .bind(&object.dedup_key)
            .bind(object.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(inserted as usize)
    }

    async fn find_by_data_id(&self, data_id: i64) -> Result<Vec<AnnotationObject>, RepositoryError> {
        let rows: Vec<AnnotationRow> = sqlx::query_as(
            r#"
            SELECT dataset_id, data_id, class_attributes, source_type, source_id, dedup_key, created_at
            FROM annotation_objects WHERE data_id = ? ORDER BY id
            "#,
        )
        .bind(data_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(AnnotationObject::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::{generate_dedup_key, AnnotatedObject, RECTANGLE_OBJECT_TYPE};
    use crate::domain::geometry::Point2D;
    use crate::infrastructure::persistence::sqlite::test_pool;

    fn object(index: usize) -> AnnotationObject {
        let annotated = AnnotatedObject::polygon(
            RECTANGLE_OBJECT_TYPE,
            vec![Point2D::new(0.0, 0.0), Point2D::new(index as f64, 1.0)],
        );
        AnnotationObject::from_model(5, 11, 1, generate_dedup_key(9001, 11, index), &annotated).unwrap()
    }

    #[tokio::test]
    async fn test_save_batch_skips_existing_keys() {
        let store = SqliteAnnotationStore::new(test_pool().await);

        assert_eq!(store.save_batch(&[object(0), object(1)]).await.unwrap(), 2);
        assert_eq!(store.save_batch(&[object(1), object(2)]).await.unwrap(), 1);

        let stored = store.find_by_data_id(11).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].source_type, SourceType::Model);
        assert_eq!(stored[1].class_attributes["points"][1]["x"], 1.0);
        assert!(store.find_by_data_id(12).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = SqliteAnnotationStore::new(test_pool().await);
        assert_eq!(store.save_batch(&[]).await.unwrap(), 0);
    }
}
