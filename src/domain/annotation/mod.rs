//! Annotation Context - 标注结果限界上下文
//!
//! 职责:
//! - 推理结果的规范化表示（AnnotationResult）
//! - 持久化标注对象（AnnotationObject）
//! - 分类属性与置信度范围

mod entities;
mod value_objects;

pub use entities::{
    generate_dedup_key, AnnotatedObject, AnnotationObject, AnnotationResult, CUBOID_OBJECT_TYPE,
    ISS_OBJECT_TYPE, RECTANGLE_OBJECT_TYPE,
};
pub use value_objects::{
    ClassificationAttribute, ConfidenceRange, DataAnnotation, ResultCode, SourceType,
};
