//! Export Processors - ISS / 3D / ISS_UNIFIED 数据提取
//!
//! 每个字段在独立的容错边界内处理：某个字段解析失败只记录告警，
//! 不影响其他字段的提取。

use serde_json::{Map, Value};
use thiserror::Error;

use super::ExportRecord;
use crate::domain::geometry::{Point3D, Rotation3D};

/// ISS 统一格式对象类型
pub const ISS_UNIFIED_TYPE: &str = "ISS_UNIFIED";

const THREE_D_TYPES: &[&str] = &[
    "THREE_D_POLYGON",
    "THREE_D_POLYLINE",
    "THREE_D_SEGMENTATION",
    "POLYGON_3D",
    "POLYLINE_3D",
    "SEGMENTATION_3D",
];

/// 单字段提取错误
#[derive(Debug, Error)]
pub enum ExportFieldError {
    #[error("field `{field}` is not {expected}")]
    UnexpectedShape {
        field: &'static str,
        expected: &'static str,
    },
}

type FieldResult<T> = Result<Option<T>, ExportFieldError>;

/// 点的两种线上形态，按 JSON 结构显式判别
enum PointShape<'a> {
    /// `{x, y, z?}`
    Object(&'a Map<String, Value>),
    /// `[x, y, z?]`
    Positional(&'a [Value]),
}

impl<'a> PointShape<'a> {
    fn classify(value: &'a Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(PointShape::Object(map)),
            Value::Array(items) => Some(PointShape::Positional(items)),
            _ => None,
        }
    }

    /// x、y 必须存在，缺失的 z 默认为 0
    fn into_point(self) -> Option<Point3D> {
        match self {
            PointShape::Object(map) => {
                let x = map.get("x").and_then(as_f64)?;
                let y = map.get("y").and_then(as_f64)?;
                let z = map.get("z").and_then(as_f64).unwrap_or(0.0);
                Some(Point3D::new(x, y, z))
            }
            PointShape::Positional(items) => {
                if items.len() < 2 {
                    return None;
                }
                let x = as_f64(&items[0])?;
                let y = as_f64(&items[1])?;
                let z = items.get(2).and_then(as_f64).unwrap_or(0.0);
                Some(Point3D::new(x, y, z))
            }
        }
    }

    fn has_z(&self) -> bool {
        match self {
            PointShape::Object(map) => map.contains_key("z"),
            PointShape::Positional(items) => items.len() >= 3,
        }
    }
}

/// 数值字段同时接受数字和数字字符串
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn object_field<'a>(contour: &'a Map<String, Value>, field: &'static str) -> FieldResult<&'a Map<String, Value>> {
    match contour.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(ExportFieldError::UnexpectedShape {
            field,
            expected: "an object",
        }),
    }
}

fn number_field(contour: &Map<String, Value>, field: &'static str) -> FieldResult<f64> {
    match contour.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_f64(value).map(Some).ok_or(ExportFieldError::UnexpectedShape {
            field,
            expected: "a number",
        }),
    }
}

fn string_field<'a>(contour: &'a Map<String, Value>, field: &'static str) -> FieldResult<&'a str> {
    match contour.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ExportFieldError::UnexpectedShape {
            field,
            expected: "a string",
        }),
    }
}

/// 字段容错边界：失败时告警并跳过
fn guarded<T>(record_id: &str, field: &'static str, result: FieldResult<T>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(object_id = %record_id, field, error = %e, "Failed to extract export field");
            None
        }
    }
}

fn extract_points_3d(contour: &Map<String, Value>) -> FieldResult<Vec<Point3D>> {
    let items = match contour.get("points") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ExportFieldError::UnexpectedShape {
                field: "points",
                expected: "an array",
            })
        }
    };

    let points: Vec<Point3D> = items
        .iter()
        .filter_map(|item| {
            let point = PointShape::classify(item).and_then(PointShape::into_point);
            if point.is_none() {
                tracing::warn!(point = %item, "Dropping 3D point without x/y");
            }
            point
        })
        .collect();

    Ok((!points.is_empty()).then_some(points))
}

fn extract_rotation(contour: &Map<String, Value>) -> FieldResult<Rotation3D> {
    let rotation = object_field(contour, "rotation3D")?;
    Ok(rotation.map(|r| {
        let angle = |key: &str| r.get(key).and_then(as_f64).unwrap_or(0.0);
        Rotation3D::new(angle("pitch"), angle("yaw"), angle("roll"))
    }))
}

/// 解析单个 3D 点（对象或数组形式）
pub fn parse_point_3d(value: &Value) -> Option<Point3D> {
    PointShape::classify(value).and_then(PointShape::into_point)
}

/// ISS 提取：多通道掩码、实例元数据、面积
pub fn process_iss_data(contour: &Map<String, Value>, record: &mut ExportRecord) {
    let id = record.id.clone();
    if let Some(mask) = guarded(&id, "multiChannelMask", object_field(contour, "multiChannelMask")) {
        record.multi_channel_mask = Some(mask.clone());
    }
    if let Some(metadata) = guarded(&id, "issMetadata", object_field(contour, "issMetadata")) {
        record.iss_metadata = Some(metadata.clone());
    }
    if let Some(area) = guarded(&id, "area", number_field(contour, "area")) {
        record.area = Some(area);
    }
}

/// 3D 提取：点列表、高度、Z 坐标、旋转
pub fn process_3d_data(contour: &Map<String, Value>, record: &mut ExportRecord, object_type: &str) {
    let object_type = match object_type.trim() {
        "" => "UNKNOWN",
        t => t,
    };
    let id = record.id.clone();

    if let Some(points) = guarded(&id, "points", extract_points_3d(contour)) {
        tracing::debug!(object_id = %id, object_type, count = points.len(), "Processed 3D points");
        record.points_3d = Some(points);
    }
    if let Some(height) = guarded(&id, "height", number_field(contour, "height")) {
        record.height = Some(height);
    }
    // 两个历史字段名
    let z = if contour.contains_key("z") {
        guarded(&id, "z", number_field(contour, "z"))
    } else {
        guarded(&id, "zCoordinate", number_field(contour, "zCoordinate"))
    };
    if let Some(z) = z {
        record.z_coordinate = Some(z);
    }
    if let Some(rotation) = guarded(&id, "rotation3D", extract_rotation(contour)) {
        record.rotation_3d = Some(rotation);
    }
}

/// ISS_UNIFIED 提取：统一掩码、压缩掩码、实例元数据
pub fn process_iss_unified_data(contour: &Map<String, Value>, record: &mut ExportRecord) {
    let id = record.id.clone();
    if let Some(unified) = guarded(&id, "unifiedMaskData", object_field(contour, "unifiedMaskData")) {
        record.unified_mask_data = Some(unified.clone());
    }
    if let Some(compressed) = guarded(&id, "compressedMask", string_field(contour, "compressedMask")) {
        if !compressed.trim().is_empty() {
            let mut mask = Map::new();
            mask.insert("compressedMask".to_string(), Value::String(compressed.to_string()));
            record.multi_channel_mask = Some(mask);
        }
    }
    if let Some(metadata) = guarded(&id, "issMetadata", object_field(contour, "issMetadata")) {
        record.iss_metadata = Some(metadata.clone());
    }
}

/// ISS 完整性检查（必要非充分）：至少包含一个 ISS 字段
pub fn validate_iss_data(contour: &Map<String, Value>) -> bool {
    ["multiChannelMask", "issMetadata", "area", "unifiedMaskData"]
        .iter()
        .any(|key| contour.contains_key(*key))
}

/// 3D 完整性检查：点列表非空且首个点带 Z 坐标
pub fn validate_3d_data(contour: &Map<String, Value>) -> bool {
    let first = match contour.get("points") {
        Some(Value::Array(items)) => items.first(),
        _ => None,
    };
    first
        .and_then(PointShape::classify)
        .map(|shape| shape.has_z())
        .unwrap_or(false)
}

/// ISS_UNIFIED 完整性检查：unifiedMaskData.instances 非空
pub fn validate_iss_unified_data(contour: &Map<String, Value>) -> bool {
    match contour.get("unifiedMaskData") {
        Some(Value::Object(unified)) => matches!(
            unified.get("instances"),
            Some(Value::Object(instances)) if !instances.is_empty()
        ),
        _ => false,
    }
}

pub fn is_iss_type(object_type: &str) -> bool {
    object_type.trim() == ISS_UNIFIED_TYPE
}

pub fn is_3d_type(object_type: &str) -> bool {
    THREE_D_TYPES.contains(&object_type.trim())
}

/// 按对象类型对导出记录执行对应的提取
pub fn enrich_export_record(record: &mut ExportRecord) {
    let Some(contour) = record.contour.clone() else {
        tracing::debug!(object_id = %record.id, "Contour is missing, skipping export enrichment");
        return;
    };
    let object_type = record.object_type.clone();

    if is_iss_type(&object_type) {
        if !validate_iss_unified_data(&contour) {
            tracing::warn!(object_id = %record.id, "ISS_UNIFIED contour has no instances");
        }
        process_iss_unified_data(&contour, record);
    } else if is_3d_type(&object_type) {
        process_3d_data(&contour, record, &object_type);
    } else if validate_iss_data(&contour) {
        process_iss_data(&contour, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contour(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("contour must be an object"),
        }
    }

    #[test]
    fn test_parse_positional_point_without_z() {
        let point = parse_point_3d(&json!([1.0, 2.0])).unwrap();
        assert_eq!(point, Point3D::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_parse_object_point() {
        assert_eq!(
            parse_point_3d(&json!({"x": 1, "y": "2.5", "z": 3})).unwrap(),
            Point3D::new(1.0, 2.5, 3.0)
        );
        assert!(parse_point_3d(&json!({"x": 1})).is_none());
        assert!(parse_point_3d(&json!([1.0])).is_none());
        assert!(parse_point_3d(&json!("1,2")).is_none());
    }

    #[test]
    fn test_validate_iss_area_alone_is_enough() {
        assert!(validate_iss_data(&contour(json!({"area": 500}))));
        assert!(!validate_iss_data(&contour(json!({}))));
    }

    #[test]
    fn test_process_3d_drops_points_missing_coordinates() {
        let c = contour(json!({
            "points": [[1.0, 2.0, 3.0], {"x": 4.0}, {"x": 5.0, "y": 6.0}, [7.0]],
            "height": 1.5,
            "zCoordinate": 0.25,
            "rotation3D": {"pitch": 0.1, "yaw": 0.2, "roll": 0.3}
        }));
        let mut record = ExportRecord::new("obj-1", "POLYGON_3D");
        process_3d_data(&c, &mut record, "POLYGON_3D");

        assert_eq!(
            record.points_3d.unwrap(),
            vec![Point3D::new(1.0, 2.0, 3.0), Point3D::new(5.0, 6.0, 0.0)]
        );
        assert_eq!(record.height, Some(1.5));
        assert_eq!(record.z_coordinate, Some(0.25));
        assert_eq!(record.rotation_3d, Some(Rotation3D::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn test_process_3d_prefers_z_over_legacy_name() {
        let c = contour(json!({"z": 1.0, "zCoordinate": 2.0}));
        let mut record = ExportRecord::new("obj-1", "POLYLINE_3D");
        process_3d_data(&c, &mut record, "POLYLINE_3D");
        assert_eq!(record.z_coordinate, Some(1.0));
    }

    #[test]
    fn test_bad_field_does_not_abort_other_fields() {
        let c = contour(json!({
            "multiChannelMask": "not-an-object",
            "issMetadata": {"instanceId": 3},
            "area": 42
        }));
        let mut record = ExportRecord::new("obj-2", "ISS");
        process_iss_data(&c, &mut record);

        assert!(record.multi_channel_mask.is_none());
        assert_eq!(record.iss_metadata.unwrap()["instanceId"], 3);
        assert_eq!(record.area, Some(42.0));
    }

    #[test]
    fn test_bad_points_keep_rotation() {
        let c = contour(json!({"points": {"x": 1}, "rotation3D": {"yaw": 1.0}}));
        let mut record = ExportRecord::new("obj-3", "THREE_D_POLYGON");
        process_3d_data(&c, &mut record, "");
        assert!(record.points_3d.is_none());
        assert_eq!(record.rotation_3d, Some(Rotation3D::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_iss_unified_wraps_compressed_mask() {
        let c = contour(json!({
            "unifiedMaskData": {"instances": {"1": {"classId": 4}}},
            "compressedMask": "0:10,1:5"
        }));
        assert!(validate_iss_unified_data(&c));

        let mut record = ExportRecord::new("obj-4", ISS_UNIFIED_TYPE);
        process_iss_unified_data(&c, &mut record);
        assert!(record.unified_mask_data.is_some());
        assert_eq!(record.multi_channel_mask.unwrap()["compressedMask"], "0:10,1:5");
    }

    #[test]
    fn test_iss_unified_validation_requires_instances() {
        assert!(!validate_iss_unified_data(&contour(json!({"unifiedMaskData": {"instances": {}}}))));
        assert!(!validate_iss_unified_data(&contour(json!({"unifiedMaskData": {}}))));
        assert!(!validate_iss_unified_data(&contour(json!({"area": 1}))));
    }

    #[test]
    fn test_validate_3d_requires_z_on_first_point() {
        assert!(validate_3d_data(&contour(json!({"points": [[1, 2, 3]]}))));
        assert!(validate_3d_data(&contour(json!({"points": [{"x": 1, "y": 2, "z": 0}]}))));
        assert!(!validate_3d_data(&contour(json!({"points": [[1, 2]]}))));
        assert!(!validate_3d_data(&contour(json!({"points": []}))));
    }

    #[test]
    fn test_type_helpers() {
        assert!(is_iss_type(" ISS_UNIFIED "));
        assert!(!is_iss_type("ISS"));
        assert!(is_3d_type("SEGMENTATION_3D"));
        assert!(!is_3d_type("3D_BOX"));
    }

    #[test]
    fn test_enrich_routes_by_type() {
        let mut record = ExportRecord::new("obj-5", "POLYGON")
            .with_contour(contour(json!({"area": 12, "points": [[1, 2, 3]]})));
        enrich_export_record(&mut record);
        assert_eq!(record.area, Some(12.0));
        assert!(record.points_3d.is_none());

        let mut record = ExportRecord::new("obj-6", "POLYGON_3D")
            .with_contour(contour(json!({"area": 12, "points": [[1, 2, 3]]})));
        enrich_export_record(&mut record);
        assert!(record.area.is_none());
        assert_eq!(record.points_3d.unwrap().len(), 1);
    }
}
