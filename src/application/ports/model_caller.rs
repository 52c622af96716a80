//! Model Caller Port - 远程推理服务抽象
//!
//! 定义推理调用的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::application::dto::{ModelRequest, RawModelResponse};

/// 远程调用错误
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 非 200 响应，携带响应体
    #[error("Model service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// 是否可重试：超时、连接失败、5xx
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::NetworkError(_) | RpcError::Timeout => true,
            RpcError::Status { status, .. } => *status >= 500,
            RpcError::InvalidResponse(_) => false,
        }
    }
}

/// Model Caller Port
///
/// 每次调用独立，实现必须可并发使用
#[async_trait]
pub trait ModelCallerPort: Send + Sync {
    /// 向 `url` 发送推理请求
    async fn invoke(&self, request: &ModelRequest, url: &str) -> Result<RawModelResponse, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RpcError::Timeout.is_transient());
        assert!(RpcError::NetworkError("refused".into()).is_transient());
        assert!(RpcError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!RpcError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!RpcError::InvalidResponse("eof".into()).is_transient());
    }
}
