//! Job Stream Port - 消费组流抽象
//!
//! 只定义调度器需要的消费组语义：读取、确认、重新投递。
//! 具体实现在 infrastructure 层（内存 / SQLite）。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Stream 错误
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream backend error: {0}")]
    Backend(String),
}

/// 流记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// 流内唯一 ID，用于确认
    pub id: String,
    /// JSON 编码的任务消息
    pub payload: String,
    /// 第几次投递（从 1 开始）
    pub delivery_count: u32,
}

/// Job Stream Port
///
/// 实例绑定到一个 stream key + consumer group。
/// 已读取但未确认的记录在空闲超时后重新可读（至少一次语义）。
#[async_trait]
pub trait JobStreamPort: Send + Sync {
    /// 追加记录，返回记录 ID
    async fn publish(&self, payload: String) -> Result<String, StreamError>;

    /// 读取最多 `count` 条记录；无可读记录时最多阻塞 `block`
    async fn read(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamRecord>, StreamError>;

    /// 确认记录，返回是否确认了一条待处理记录
    async fn ack(&self, record_id: &str) -> Result<bool, StreamError>;

    /// 尚未确认的记录数
    async fn pending_count(&self) -> Result<usize, StreamError>;
}
