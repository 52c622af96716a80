//! HTTP Model Caller - 调用远程推理 HTTP 服务
//!
//! 实现 ModelCallerPort trait
//!
//! POST {url}
//! Request: {"datas": [{"id", "url", "type", "points"}]}  (JSON)
//! Response: {"code", "message", "data": [...]}  (JSON, 仅 200 视为成功)

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::application::dto::{ModelRequest, RawModelResponse};
use crate::application::ports::{ModelCallerPort, RpcError};

/// HTTP 推理客户端配置
#[derive(Debug, Clone)]
pub struct HttpModelCallerConfig {
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 资源 URL 中的本地主机占位符
    pub placeholder_host: String,
    /// 替换占位符的可解析主机，未设置时不改写
    pub resource_host: Option<String>,
}

impl Default for HttpModelCallerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            placeholder_host: "localhost".to_string(),
            resource_host: None,
        }
    }
}

impl HttpModelCallerConfig {
    pub fn with_resource_host(mut self, host: impl Into<String>) -> Self {
        self.resource_host = Some(host.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// 将资源 URL 中的占位主机替换为可解析主机
pub fn rewrite_resource_url(url: &str, placeholder: &str, host: &str) -> String {
    if placeholder.is_empty() || !url.contains(placeholder) {
        return url.to_string();
    }
    url.replace(placeholder, host)
}

/// 只有 200 视为成功，其他状态携带响应体作为错误详情
pub fn check_status(status: u16, body: &str) -> Result<(), RpcError> {
    if status == 200 {
        Ok(())
    } else {
        Err(RpcError::Status {
            status,
            body: body.to_string(),
        })
    }
}

/// HTTP 推理客户端
pub struct HttpModelCaller {
    client: Client,
    config: HttpModelCallerConfig,
}

impl HttpModelCaller {
    pub fn new(config: HttpModelCallerConfig) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RpcError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 发送前改写请求中的资源 URL
    fn prepare(&self, request: &ModelRequest) -> ModelRequest {
        let mut prepared = request.clone();
        if let Some(host) = self.config.resource_host.as_deref() {
            for data in &mut prepared.datas {
                data.url = rewrite_resource_url(&data.url, &self.config.placeholder_host, host);
            }
        }
        prepared
    }
}

#[async_trait]
impl ModelCallerPort for HttpModelCaller {
    async fn invoke(&self, request: &ModelRequest, url: &str) -> Result<RawModelResponse, RpcError> {
        let body = self.prepare(request);

        tracing::debug!(url = %url, targets = body.datas.len(), "Sending model request");

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else if e.is_connect() {
                    RpcError::NetworkError(format!("Cannot connect to model service: {}", e))
                } else {
                    RpcError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout
            } else {
                RpcError::NetworkError(e.to_string())
            }
        })?;
        check_status(status, &String::from_utf8_lossy(&bytes))?;

        let result: RawModelResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to decode model response: {}", e)))?;

        tracing::info!(
            url = %url,
            code = ?result.code,
            items = result.data.as_ref().map(Vec::len).unwrap_or(0),
            "Model call completed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::InferenceRequest;

    #[test]
    fn test_config_default() {
        let config = HttpModelCallerConfig::default();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.placeholder_host, "localhost");
        assert!(config.resource_host.is_none());
    }

    #[test]
    fn test_rewrite_resource_url() {
        assert_eq!(
            rewrite_resource_url("http://localhost:9000/bucket/a.jpg", "localhost", "minio"),
            "http://minio:9000/bucket/a.jpg"
        );
        assert_eq!(
            rewrite_resource_url("http://cdn.example.com/a.jpg", "localhost", "minio"),
            "http://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_prepare_rewrites_only_with_host() {
        let request = ModelRequest::single(InferenceRequest::new(1, "http://localhost:9000/a.jpg"));

        let caller = HttpModelCaller::new(HttpModelCallerConfig::default()).unwrap();
        assert_eq!(caller.prepare(&request), request);

        let caller = HttpModelCaller::new(HttpModelCallerConfig::default().with_resource_host("10.0.0.8")).unwrap();
        assert_eq!(caller.prepare(&request).datas[0].url, "http://10.0.0.8:9000/a.jpg");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(200, "").is_ok());
        let err = check_status(502, "bad gateway").unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Model service returned status 502: bad gateway");
        assert!(!check_status(400, "bad prompt").unwrap_err().is_transient());
    }
}
