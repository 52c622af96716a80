//! ISS Export - 交互式分割导出的强类型形式

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ExportRecord;
use crate::domain::geometry::Point2D;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    #[serde(default)]
    pub data: Vec<i64>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 像素级实例属性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelAttribute {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub additional_attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub compressed: Option<bool>,
    #[serde(default)]
    pub total_channels: Option<u32>,
    #[serde(default)]
    pub total_instances: Option<u32>,
    #[serde(default)]
    pub total_pixels: Option<u64>,
    #[serde(default)]
    pub annotated_pixels: Option<u64>,
}

/// 多通道掩码
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChannelMaskData {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelData>,
    #[serde(default)]
    pub pixel_attributes: Vec<PixelAttribute>,
    #[serde(default)]
    pub metadata: Option<MaskMetadata>,
    /// ISS_UNIFIED 只携带 RLE 压缩掩码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_mask: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// 包围所有点的最小矩形
    pub fn enclosing(points: &[Point2D]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

/// ISS 导出对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssExport {
    pub object_id: String,
    pub object_type: String,
    pub class_id: Option<i64>,
    pub class_name: Option<String>,
    pub multi_channel_mask: Option<MultiChannelMaskData>,
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub polygon_points: Vec<Point2D>,
    pub metadata: Option<Map<String, Value>>,
}

impl IssExport {
    /// 从已填充的导出记录构建；掩码结构不合法时记录告警并留空
    pub fn from_record(record: &ExportRecord) -> Self {
        let multi_channel_mask = record.multi_channel_mask.as_ref().and_then(|mask| {
            match serde_json::from_value::<MultiChannelMaskData>(Value::Object(mask.clone())) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(object_id = %record.id, error = %e, "Malformed multi-channel mask");
                    None
                }
            }
        });

        let polygon_points = record
            .contour
            .as_ref()
            .and_then(|c| c.get("points"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<Point2D>(item.clone()).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Self {
            object_id: record.id.clone(),
            object_type: record.object_type.clone(),
            class_id: record.class_id,
            class_name: record.class_name.clone(),
            multi_channel_mask,
            bounding_box: BoundingBox::enclosing(&polygon_points),
            polygon_points,
            metadata: record.iss_metadata.clone(),
        }
    }
}
