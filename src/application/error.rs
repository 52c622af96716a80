//! 应用层错误定义
//!
//! 推理流水线的统一错误分类

use thiserror::Error;

use crate::application::ports::{RepositoryError, RpcError};
use crate::domain::job::{JobError, ModelCode};

/// 流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 流负载无法解码（确认，不重试）
    #[error("Decode error: {0}")]
    Decode(String),

    /// 没有注册对应 Handler（确认，运维告警）
    #[error("No handler registered for model code {0}")]
    UnroutableModelCode(ModelCode),

    /// 构造请求时缺少文件/URL/必填字段
    #[error("Validation error: {0}")]
    Validation(String),

    /// 远程调用失败（重试耗尽或不可重试）
    #[error("Remote call error: {0}")]
    Rpc(#[source] RpcError),

    /// 响应结构不符合约定
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// 是否应该确认流记录（不可通过重投恢复）
    pub fn should_ack(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::UnroutableModelCode(_))
    }
}

impl From<RpcError> for PipelineError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::InvalidResponse(msg) => Self::MalformedResponse(msg),
            other => Self::Rpc(other),
        }
    }
}

impl From<JobError> for PipelineError {
    fn from(err: JobError) -> Self {
        Self::Validation(err.to_string())
    }
}
