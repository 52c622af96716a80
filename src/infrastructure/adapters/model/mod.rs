//! Model Adapter - 远程推理服务客户端实现

mod fake_model_caller;
mod http_model_caller;

pub use fake_model_caller::FakeModelCaller;
pub use http_model_caller::{check_status, rewrite_resource_url, HttpModelCaller, HttpModelCallerConfig};
