//! Export Record - 单个标注对象的导出表示

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::geometry::{Point3D, Rotation3D};

/// 导出记录
///
/// 按对象类型多态：2D 轮廓、3D 点 + 旋转、ISS 掩码。
/// 每个可选块独立填充，部分填充是合法状态。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_values: Option<Vec<Value>>,
    /// 原始轮廓数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_class: Option<String>,

    // ISS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_channel_mask: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss_metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unified_mask_data: Option<Map<String, Value>>,
    /// ISS 面积，直接取自轮廓，不重新计算
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,

    // 3D
    #[serde(rename = "points3D", default, skip_serializing_if = "Option::is_none")]
    pub points_3d: Option<Vec<Point3D>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_coordinate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(rename = "rotation3D", default, skip_serializing_if = "Option::is_none")]
    pub rotation_3d: Option<Rotation3D>,
}

impl ExportRecord {
    pub fn new(id: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_type: object_type.into(),
            ..Default::default()
        }
    }

    pub fn with_contour(mut self, contour: Map<String, Value>) -> Self {
        self.contour = Some(contour);
        self
    }
}
