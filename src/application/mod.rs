//! 应用层 - 推理流水线编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ModelCaller、JobStream、Repository）
//! - dto: 线上负载模型
//! - converters: 请求构造与响应转换
//! - handlers: 按模型代码分派的 Handler 及注册表
//! - retry: 远程调用退避重试
//! - error: 应用层错误定义

pub mod converters;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod retry;

pub use error::PipelineError;

pub use handlers::{
    default_factories, DetectionHandler, HandlerContext, HandlerFactory, HandlerRegistry,
    ImageInteractiveHandler, ImageTrackingHandler, MetricsInput, ModelHandler, RegistryError,
};

pub use ports::{
    AnnotationStorePort, JobStreamPort, ModelCallerPort, ModelClass, ModelClassRepositoryPort,
    ModelDatasetResult, ModelRunRecord, ModelRunRepositoryPort, RepositoryError, RpcError,
    StreamError, StreamRecord,
};

pub use retry::{retry_with_backoff, RetryPolicy};
