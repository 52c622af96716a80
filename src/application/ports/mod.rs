//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod job_stream;
mod model_caller;
mod repositories;

pub use job_stream::{JobStreamPort, StreamError, StreamRecord};
pub use model_caller::{ModelCallerPort, RpcError};
pub use repositories::{
    AnnotationStorePort, ModelClass, ModelClassRepositoryPort, ModelDatasetResult,
    ModelRunRecord, ModelRunRepositoryPort, RepositoryError,
};
