//! 交互式分割响应转换

use std::collections::HashMap;

use crate::application::dto::{ApiResult, InteractiveResponse, IssResult};
use crate::application::error::PipelineError;
use crate::application::ports::ModelClass;
use crate::domain::annotation::{AnnotatedObject, AnnotationResult, DataAnnotation, ISS_OBJECT_TYPE};

/// 将交互式模型响应转换为标注结果
///
/// 置信度范围过滤在此路径上不启用，所有对象原样保留。
/// 因此不接收过滤条件参数，入站的 minConfidence / maxConfidence 在这里不起作用。
pub fn build_interactive_annotation(
    result: ApiResult<InteractiveResponse>,
    class_map: &HashMap<String, ModelClass>,
) -> Result<AnnotationResult, PipelineError> {
    if !result.is_ok() {
        return Ok(AnnotationResult::failure(result.message()));
    }
    let Some(response) = result.data else {
        return Ok(AnnotationResult::success(None, Vec::new()));
    };
    if response.objects.is_empty() {
        return Ok(AnnotationResult::success(response.id, Vec::new()));
    }

    let objects = response
        .objects
        .iter()
        .map(|item| build_object(item, class_map))
        .collect::<Result<Vec<_>, _>>()?;

    let data_annotations = response
        .data_annotations
        .into_iter()
        .map(|item| DataAnnotation {
            classification_id: item.classification_id.unwrap_or_default(),
            classification_attributes: item
                .classification_attributes
                .map(|shape| shape.into_attributes())
                .unwrap_or_default(),
        })
        .collect();

    Ok(AnnotationResult::success(response.id, objects).with_data_annotations(data_annotations))
}

fn build_object(item: &IssResult, class_map: &HashMap<String, ModelClass>) -> Result<AnnotatedObject, PipelineError> {
    let contour = item
        .class_attributes
        .as_ref()
        .and_then(|attrs| attrs.contour.as_ref())
        .ok_or_else(|| PipelineError::malformed("interactive object has no contour"))?;

    let mut object = AnnotatedObject::polygon(ISS_OBJECT_TYPE, contour.points.clone());
    // 类别名尽力解析，映射缺失时保持未标注
    object.model_class = item
        .label
        .as_deref()
        .and_then(|label| class_map.get(label))
        .map(|class| class.name.clone());
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::RawModelResponse;
    use crate::domain::annotation::ClassificationAttribute;
    use crate::domain::geometry::Point2D;
    use serde_json::{json, Value};

    fn typed(value: Value) -> ApiResult<InteractiveResponse> {
        let raw: RawModelResponse = serde_json::from_value(value).unwrap();
        raw.first_item().unwrap()
    }

    fn class_map() -> HashMap<String, ModelClass> {
        HashMap::from([(
            "cat".to_string(),
            ModelClass { model_id: 2, code: "cat".into(), name: "Cat".into() },
        )])
    }

    #[test]
    fn test_failure_code_keeps_message() {
        let result = build_interactive_annotation(typed(json!({"code": "ERROR", "message": "gpu oom"})), &class_map()).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.message, "gpu oom");
        assert!(result.objects.is_empty());
    }

    #[test]
    fn test_empty_objects_is_success() {
        let result = build_interactive_annotation(
            typed(json!({"code": "OK", "data": [{"id": 11, "objects": []}]})),
            &class_map(),
        )
        .unwrap();
        assert!(result.is_success());
        assert_eq!(result.data_id, Some(11));
        assert!(result.objects.is_empty());
    }

    #[test]
    fn test_objects_and_attributes() {
        let result = build_interactive_annotation(
            typed(json!({"code": "OK", "data": [{
                "id": 11,
                "objects": [
                    {"label": "cat", "confidence": 0.1,
                     "classAttributes": {"type": "ISS", "contour": {"points": [{"x": 1, "y": 2}, {"x": 3, "y": 4}]}}},
                    {"classAttributes": {"contour": {"points": []}}}
                ],
                "dataAnnotations": [
                    {"classificationId": "c1", "classificationAttributes": {"id": "a", "values": ["x"]}},
                    {"classificationId": "c2", "classificationAttributes": {"values": [{"id": "b", "values": ["y"]}]}}
                ]
            }]})),
            &class_map(),
        )
        .unwrap();

        // 低置信度对象同样保留
        assert_eq!(result.objects.len(), 2);
        assert_eq!(result.objects[0].object_type, "ISS");
        assert_eq!(result.objects[0].points, vec![Point2D::new(1.0, 2.0), Point2D::new(3.0, 4.0)]);
        assert_eq!(result.objects[0].model_class.as_deref(), Some("Cat"));
        assert_eq!(result.objects[1].model_class, None);

        let attributes: Vec<&ClassificationAttribute> = result.classification_attributes().collect();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].id, "a");
        assert_eq!(attributes[1].values, vec!["y".to_string()]);
    }

    #[test]
    fn test_object_without_contour_is_malformed() {
        let err = build_interactive_annotation(
            typed(json!({"code": "OK", "data": [{"id": 11, "objects": [{"classId": 3}]}]})),
            &class_map(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }
}
