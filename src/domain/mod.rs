//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Job Context: 推理任务消息与提示
//! - Annotation Context: 推理结果与持久化标注对象
//! - Export Context: 标注导出富化（ISS / 3D / 掩码）

pub mod annotation;
pub mod export;
pub mod geometry;
pub mod job;
