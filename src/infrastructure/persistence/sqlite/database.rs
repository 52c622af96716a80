//! SQLite Database - 数据库连接和迁移

use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库连接 URL
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/modelrun.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            ..Self::default()
        }
    }

    /// 内存库只能单连接，否则每个连接各自一份库
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    // WAL：多个消费者并发写入
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout=5000").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

    tracing::info!(
        url = %config.database_url,
        max_connections = config.max_connections,
        "SQLite pool created"
    );

    Ok(pool)
}

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS model_run_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        model_id INTEGER NOT NULL,
        model_serial_no INTEGER NOT NULL UNIQUE,
        dataset_id INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS model_dataset_results (
        model_serial_no INTEGER NOT NULL,
        data_id INTEGER NOT NULL,
        model_id INTEGER NOT NULL,
        dataset_id INTEGER NOT NULL,
        result_filter_param TEXT,
        model_result TEXT NOT NULL,
        is_success INTEGER NOT NULL,
        error_message TEXT,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (model_serial_no, data_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS annotation_objects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        dataset_id INTEGER NOT NULL,
        data_id INTEGER NOT NULL,
        class_attributes TEXT NOT NULL,
        source_type TEXT NOT NULL,
        source_id INTEGER NOT NULL,
        dedup_key TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS model_classes (
        model_id INTEGER NOT NULL,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        PRIMARY KEY (model_id, code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_stream_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        stream_key TEXT NOT NULL,
        group_name TEXT NOT NULL,
        payload TEXT NOT NULL,
        consumer TEXT,
        delivery_count INTEGER NOT NULL DEFAULT 0,
        delivered_at INTEGER,
        acked INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_annotation_objects_data_id
    ON annotation_objects(data_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_job_stream_entries_unacked
    ON job_stream_entries(stream_key, group_name, acked, id)
    "#,
];

/// 运行数据库迁移（幂等）
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = MIGRATIONS.len(), "Database migrations completed");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
