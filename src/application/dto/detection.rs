//! 检测 / 跟踪模型的参数与响应

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::deserialize_confidence_bound;
use crate::domain::annotation::ConfidenceRange;
use crate::domain::geometry::{Cuboid, Point3D, Rotation3D, Size3D};

/// 检测过滤参数 `{minConfidence, maxConfidence, classes[]}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFilterParam {
    #[serde(default, deserialize_with = "deserialize_confidence_bound")]
    pub min_confidence: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_confidence_bound")]
    pub max_confidence: Option<f64>,
    /// 只保留这些类别标签，空表示不过滤
    #[serde(default)]
    pub classes: Vec<String>,
}

impl DetectionFilterParam {
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map.clone()))
    }

    pub fn confidence_range(&self) -> ConfidenceRange {
        ConfidenceRange::from_bounds(self.min_confidence, self.max_confidence)
    }

    pub fn accepts_class(&self, label: Option<&str>) -> bool {
        if self.classes.is_empty() {
            return true;
        }
        label.is_some_and(|l| self.classes.iter().any(|c| c == l))
    }
}

/// trackId 可能是字符串或数字
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// 检测对象
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionObject {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub left_top_x: Option<f64>,
    #[serde(default)]
    pub left_top_y: Option<f64>,
    #[serde(default)]
    pub right_bottom_x: Option<f64>,
    #[serde(default)]
    pub right_bottom_y: Option<f64>,
    #[serde(rename = "center3D", default)]
    pub center: Option<Point3D>,
    #[serde(rename = "size3D", default)]
    pub size: Option<Size3D>,
    #[serde(rename = "rotation3D", default)]
    pub rotation: Option<Rotation3D>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub track_id: Option<String>,
    #[serde(default)]
    pub track_name: Option<String>,
}

impl DetectionObject {
    /// 二维框的左上、右下角点
    pub fn box_corners(&self) -> Option<[(f64, f64); 2]> {
        Some([
            (self.left_top_x?, self.left_top_y?),
            (self.right_bottom_x?, self.right_bottom_y?),
        ])
    }

    /// 三维框，需要同时有中心和尺寸，缺省旋转为零
    pub fn cuboid(&self) -> Option<Cuboid> {
        Some(Cuboid {
            center: self.center?,
            size: self.size?,
            rotation: self.rotation.unwrap_or_default(),
        })
    }
}

/// 检测响应（单个推理目标）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub objects: Vec<DetectionObject>,
}
