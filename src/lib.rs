//! ModelRun - 模型推理结果流水线
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Job Context: 推理任务消息、模型代码、交互提示
//! - Annotation Context: 标注结果、标注对象、去重 key
//! - Export: ISS / 3D 导出记录、二值掩码编解码
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ModelCaller, JobStream, Repositories）
//! - Converters: 请求构造与响应转换
//! - Handlers: 按模型代码分派的 Handler 及注册表
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 推理客户端
//! - Memory: 内存消费组流
//! - Persistence: SQLite 存储与持久化流
//! - Worker: JobDispatcher 流消费者

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
