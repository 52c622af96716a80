//! Annotation Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ClassificationAttribute, DataAnnotation, ResultCode, SourceType};
use crate::domain::geometry::{Cuboid, Point2D};

/// 交互式分割对象类型
pub const ISS_OBJECT_TYPE: &str = "ISS";
/// 二维矩形对象类型
pub const RECTANGLE_OBJECT_TYPE: &str = "RECTANGLE";
/// 三维框对象类型
pub const CUBOID_OBJECT_TYPE: &str = "3D_BOX";

/// 模型识别出的单个对象
///
/// 序列化后作为 AnnotationObject 的 classAttributes 持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedObject {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point2D>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// 可读类别名，类别映射缺失时为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_class: Option<String>,
    #[serde(flatten)]
    pub cuboid: Option<Cuboid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
}

impl AnnotatedObject {
    pub fn polygon(object_type: impl Into<String>, points: Vec<Point2D>) -> Self {
        Self {
            object_type: object_type.into(),
            points,
            confidence: None,
            model_class: None,
            cuboid: None,
            track_id: None,
            track_name: None,
        }
    }
}

/// 一次推理的规范化结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationResult {
    pub code: ResultCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub objects: Vec<AnnotatedObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_annotations: Vec<DataAnnotation>,
}

impl AnnotationResult {
    pub fn success(data_id: Option<i64>, objects: Vec<AnnotatedObject>) -> Self {
        Self {
            code: ResultCode::Ok,
            message: "success".to_string(),
            data_id,
            confidence: None,
            objects,
            data_annotations: Vec::new(),
        }
    }

    /// 远端返回失败代码：保留原始消息，对象列表为空
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: ResultCode::Error,
            message: message.into(),
            data_id: None,
            confidence: None,
            objects: Vec::new(),
            data_annotations: Vec::new(),
        }
    }

    pub fn with_data_annotations(mut self, data_annotations: Vec<DataAnnotation>) -> Self {
        self.data_annotations = data_annotations;
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Ok
    }

    /// 所有数据级分类属性（扁平化）
    pub fn classification_attributes(&self) -> impl Iterator<Item = &ClassificationAttribute> {
        self.data_annotations
            .iter()
            .flat_map(|a| a.classification_attributes.iter())
    }
}

/// 持久化的标注对象（按推理批次追加写入，创建后不再修改）
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationObject {
    pub dataset_id: i64,
    pub data_id: i64,
    pub class_attributes: Value,
    pub source_type: SourceType,
    /// 推理运行记录 ID（溯源）
    pub source_id: i64,
    /// 自然去重 key，重复投递时不会重复写入
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
}

impl AnnotationObject {
    pub fn from_model(
        dataset_id: i64,
        data_id: i64,
        run_record_id: i64,
        dedup_key: String,
        object: &AnnotatedObject,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            dataset_id,
            data_id,
            class_attributes: serde_json::to_value(object)?,
            source_type: SourceType::Model,
            source_id: run_record_id,
            dedup_key,
            created_at: Utc::now(),
        })
    }
}

/// 生成标注对象去重 key
///
/// md5(model_serial_no, data_id, object_index)
pub fn generate_dedup_key(model_serial_no: i64, data_id: i64, object_index: usize) -> String {
    let digest = md5::compute(format!("{}:{}:{}", model_serial_no, data_id, object_index));
    format!("{:x}", digest)
}
