//! Job Context - 推理任务限界上下文
//!
//! 职责:
//! - 推理任务消息（JobMessage）
//! - 模型代码与交互提示值对象
//! - 源数据文件解析

mod entities;
mod errors;
mod value_objects;

pub use entities::{DataInfo, FileNode, FileRef, JobMessage, FILE_NODE_TYPE};
pub use errors::JobError;
pub use value_objects::{InteractivePrompt, ModelCode, PromptPoint, PromptType};
