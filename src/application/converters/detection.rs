//! 检测模型请求构建与响应转换（图像检测 / 点云检测）

use std::collections::HashMap;

use crate::application::dto::{ApiResult, DetectionFilterParam, DetectionObject, DetectionResponse, InferenceRequest, ModelRequest};
use crate::application::error::PipelineError;
use crate::application::ports::ModelClass;
use crate::domain::annotation::{AnnotatedObject, AnnotationResult, CUBOID_OBJECT_TYPE, RECTANGLE_OBJECT_TYPE};
use crate::domain::geometry::Point2D;
use crate::domain::job::JobMessage;

/// 检测请求：单目标，无提示
pub fn build_detection_request(message: &JobMessage) -> Result<ModelRequest, PipelineError> {
    let url = message.require_data_info()?.primary_file_url()?;
    Ok(ModelRequest::single(InferenceRequest::new(message.data_id, url)))
}

/// 检测对象 -> 标注对象；既没有二维框也没有三维框时返回 None
pub(crate) fn to_annotated_object(
    object: &DetectionObject,
    class_map: &HashMap<String, ModelClass>,
) -> Option<AnnotatedObject> {
    let mut annotated = if let Some(cuboid) = object.cuboid() {
        let mut annotated = AnnotatedObject::polygon(CUBOID_OBJECT_TYPE, Vec::new());
        annotated.cuboid = Some(cuboid);
        annotated
    } else {
        let [(x1, y1), (x2, y2)] = object.box_corners()?;
        AnnotatedObject::polygon(RECTANGLE_OBJECT_TYPE, vec![Point2D::new(x1, y1), Point2D::new(x2, y2)])
    };

    if let Some(object_type) = object.object_type.as_deref().filter(|t| !t.trim().is_empty()) {
        annotated.object_type = object_type.to_string();
    }
    annotated.confidence = object.confidence;
    annotated.model_class = object
        .label
        .as_deref()
        .and_then(|label| class_map.get(label))
        .map(|class| class.name.clone());
    Some(annotated)
}

/// 平均置信度（忽略没有置信度的对象）
pub(crate) fn mean_confidence(objects: &[AnnotatedObject]) -> Option<f64> {
    let values: Vec<f64> = objects.iter().filter_map(|o| o.confidence).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 检测响应 -> 标注结果，应用置信度范围与类别过滤
pub fn build_detection_annotation(
    result: ApiResult<DetectionResponse>,
    class_map: &HashMap<String, ModelClass>,
    filter: &DetectionFilterParam,
) -> AnnotationResult {
    if !result.is_ok() {
        return AnnotationResult::failure(result.message());
    }
    let Some(response) = result.data else {
        return AnnotationResult::success(None, Vec::new());
    };

    let range = filter.confidence_range();
    let objects: Vec<AnnotatedObject> = response
        .objects
        .iter()
        .filter(|o| range.contains(o.confidence) && filter.accepts_class(o.label.as_deref()))
        .filter_map(|o| {
            let annotated = to_annotated_object(o, class_map);
            if annotated.is_none() {
                tracing::warn!(label = ?o.label, "Dropping detection object without geometry");
            }
            annotated
        })
        .collect();

    tracing::debug!(
        data_id = ?response.id,
        received = response.objects.len(),
        kept = objects.len(),
        "Filtered detection objects"
    );

    let confidence = response.confidence.or_else(|| mean_confidence(&objects));
    AnnotationResult::success(response.id, objects).with_confidence(confidence)
}
