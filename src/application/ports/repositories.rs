//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（如 SQLite）

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::domain::annotation::AnnotationObject;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Annotation Store
// ============================================================================

/// Annotation Store Port
///
/// 标注对象追加写入，按 dedup_key 去重
#[async_trait]
pub trait AnnotationStorePort: Send + Sync {
    /// 批量保存，返回实际新写入的数量（已存在的 dedup_key 被跳过）
    async fn save_batch(&self, objects: &[AnnotationObject]) -> Result<usize, RepositoryError>;

    /// 获取数据的所有标注对象
    async fn find_by_data_id(&self, data_id: i64) -> Result<Vec<AnnotationObject>, RepositoryError>;
}

// ============================================================================
// Model Run Records
// ============================================================================

/// 推理运行记录（由上游创建，一次运行对应一个 serial no）
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRunRecord {
    pub id: i64,
    pub model_id: i64,
    pub model_serial_no: i64,
    pub dataset_id: i64,
    pub created_at: DateTime<Utc>,
}

/// 单条数据的推理结果
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDatasetResult {
    pub model_id: i64,
    pub model_serial_no: i64,
    pub data_id: i64,
    pub dataset_id: i64,
    pub result_filter_param: Option<Value>,
    /// 规范化后的推理结果 JSON
    pub model_result: Value,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Model Run Repository Port
#[async_trait]
pub trait ModelRunRepositoryPort: Send + Sync {
    /// 创建运行记录，返回带 ID 的记录
    async fn create_run(
        &self,
        model_id: i64,
        model_serial_no: i64,
        dataset_id: i64,
    ) -> Result<ModelRunRecord, RepositoryError>;

    /// 根据 serial no 查找运行记录
    async fn find_by_serial_no(&self, model_serial_no: i64) -> Result<Option<ModelRunRecord>, RepositoryError>;

    /// 保存数据推理结果，(serial no, data id) 已存在时覆盖
    async fn save_dataset_result(&self, result: &ModelDatasetResult) -> Result<(), RepositoryError>;

    /// 获取一次运行的所有数据结果
    async fn find_dataset_results(&self, model_serial_no: i64) -> Result<Vec<ModelDatasetResult>, RepositoryError>;
}

// ============================================================================
// Model Classes
// ============================================================================

/// 模型类别定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelClass {
    pub model_id: i64,
    /// 模型输出的类别标签
    pub code: String,
    /// 可读名称
    pub name: String,
}

/// Model Class Repository Port
#[async_trait]
pub trait ModelClassRepositoryPort: Send + Sync {
    async fn save(&self, class: &ModelClass) -> Result<(), RepositoryError>;

    /// 标签 -> 类别定义
    async fn class_map(&self, model_id: i64) -> Result<HashMap<String, ModelClass>, RepositoryError>;
}
