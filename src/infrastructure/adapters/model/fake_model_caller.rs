//! Fake Model Caller - 用于测试和本地联调的推理客户端
//!
//! 按顺序返回预置的响应，不实际调用远程服务

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::application::dto::{ModelRequest, RawModelResponse, ResponseCode};
use crate::application::ports::{ModelCallerPort, RpcError};

/// Fake Model Caller
///
/// 脚本用完后返回默认响应（成功、无对象）
pub struct FakeModelCaller {
    script: Mutex<VecDeque<Result<RawModelResponse, RpcError>>>,
    requests: Mutex<Vec<(ModelRequest, String)>>,
    calls: AtomicUsize,
}

impl Default for FakeModelCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeModelCaller {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 追加一次调用的结果
    pub fn push(&self, result: Result<RawModelResponse, RpcError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
    }

    /// 追加一次 JSON 响应；无法解析时作为 InvalidResponse
    pub fn push_json(&self, body: serde_json::Value) {
        self.push(serde_json::from_value(body).map_err(|e| RpcError::InvalidResponse(e.to_string())));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 已收到的请求及目标 URL
    pub fn requests(&self) -> Vec<(ModelRequest, String)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn default_response(request: &ModelRequest) -> RawModelResponse {
        let data = request
            .datas
            .iter()
            .map(|d| json!({"id": d.id, "objects": []}))
            .collect();
        RawModelResponse {
            code: ResponseCode::Text("OK".to_string()),
            message: Some("success".to_string()),
            data: Some(data),
        }
    }
}

#[async_trait]
impl ModelCallerPort for FakeModelCaller {
    async fn invoke(&self, request: &ModelRequest, url: &str) -> Result<RawModelResponse, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((request.clone(), url.to_string()));
        }
        tracing::debug!(url = %url, targets = request.datas.len(), "FakeModelCaller: returning scripted response");

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        scripted.unwrap_or_else(|| Ok(Self::default_response(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::InferenceRequest;

    #[tokio::test]
    async fn test_script_then_default() {
        let caller = FakeModelCaller::new();
        caller.push(Err(RpcError::Timeout));
        let request = ModelRequest::single(InferenceRequest::new(7, "http://minio/a.jpg"));

        assert!(matches!(caller.invoke(&request, "http://model").await, Err(RpcError::Timeout)));
        let result = caller.invoke(&request, "http://model").await.unwrap();
        assert!(result.is_ok());
        assert_eq!(result.data.unwrap()[0]["id"], 7);
        assert_eq!(caller.call_count(), 2);
        assert_eq!(caller.requests()[0].1, "http://model");
    }
}
