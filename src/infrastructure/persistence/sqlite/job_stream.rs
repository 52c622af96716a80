//! SQLite Job Stream - 持久化消费组流
//!
//! 领取通过单条 `UPDATE ... RETURNING` 完成，多个消费者并发读取不会拿到同一条记录。

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{JobStreamPort, StreamError, StreamRecord};

/// 阻塞读取时的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct SqliteJobStream {
    pool: DbPool,
    stream_key: String,
    group: String,
    redelivery_idle: Duration,
}

impl SqliteJobStream {
    pub fn new(
        pool: DbPool,
        stream_key: impl Into<String>,
        group: impl Into<String>,
        redelivery_idle: Duration,
    ) -> Self {
        Self {
            pool,
            stream_key: stream_key.into(),
            group: group.into(),
            redelivery_idle,
        }
    }

    async fn claim(&self, consumer: &str, count: usize) -> Result<Vec<StreamRecord>, StreamError> {
        let now = Utc::now().timestamp_millis();
        let idle_before = now - self.redelivery_idle.as_millis() as i64;

        let mut rows: Vec<ClaimedRow> = sqlx::query_as(
            r#"
            UPDATE job_stream_entries
            SET consumer = ?, delivery_count = delivery_count + 1, delivered_at = ?
            WHERE id IN (
                SELECT id FROM job_stream_entries
                WHERE stream_key = ? AND group_name = ? AND acked = 0
                  AND (delivered_at IS NULL OR delivered_at <= ?)
                ORDER BY id
                LIMIT ?
            )
            RETURNING id, payload, delivery_count
            "#,
        )
        .bind(consumer)
        .bind(now)
        .bind(&self.stream_key)
        .bind(&self.group)
        .bind(idle_before)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.sort_by_key(|row| row.id);
        Ok(rows.into_iter().map(StreamRecord::from).collect())
    }
}

#[derive(FromRow)]
struct ClaimedRow {
    id: i64,
    payload: String,
    delivery_count: i64,
}

impl From<ClaimedRow> for StreamRecord {
    fn from(row: ClaimedRow) -> Self {
        StreamRecord {
            id: format!("{}-0", row.id),
            payload: row.payload,
            delivery_count: row.delivery_count.max(0) as u32,
        }
    }
}

fn backend(e: sqlx::Error) -> StreamError {
    StreamError::Backend(e.to_string())
}

#[async_trait]
impl JobStreamPort for SqliteJobStream {
    async fn publish(&self, payload: String) -> Result<String, StreamError> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_stream_entries (stream_key, group_name, payload, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&self.stream_key)
        .bind(&self.group)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(format!("{}-0", result.last_insert_rowid()))
    }

    async fn read(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamRecord>, StreamError> {
        let deadline = tokio::time::Instant::now() + block;
        loop {
            let records = self.claim(consumer, count).await?;
            let now = tokio::time::Instant::now();
            if !records.is_empty() || now >= deadline {
                return Ok(records);
            }
            tokio::time::sleep((deadline - now).min(POLL_INTERVAL)).await;
        }
    }

    async fn ack(&self, record_id: &str) -> Result<bool, StreamError> {
        let Some(id) = record_id.split('-').next().and_then(|s| s.parse::<i64>().ok()) else {
            return Ok(false);
        };
        let result = sqlx::query(
            r#"
            UPDATE job_stream_entries SET acked = 1
            WHERE id = ? AND stream_key = ? AND group_name = ? AND acked = 0 AND delivered_at IS NOT NULL
            "#,
        )
        .bind(id)
        .bind(&self.stream_key)
        .bind(&self.group)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn pending_count(&self) -> Result<usize, StreamError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM job_stream_entries WHERE stream_key = ? AND group_name = ? AND acked = 0",
        )
        .bind(&self.stream_key)
        .bind(&self.group)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(count as usize)
    }
}
