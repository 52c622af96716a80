//! 交互式分割请求构建

use crate::application::dto::{InferenceRequest, InteractiveFilterParam, ModelRequest};
use crate::application::error::PipelineError;
use crate::domain::job::JobMessage;

/// 由任务消息构建交互式推理请求
///
/// 内容没有文件节点或文件 URL 为空时返回 `Validation`。
/// 没有任何提示来源时提示列表为空（整图默认推理）。
pub fn build_interactive_request(message: &JobMessage) -> Result<ModelRequest, PipelineError> {
    let data_info = message.require_data_info()?;
    let url = data_info.primary_file_url()?;
    let filter = InteractiveFilterParam::from_map(&message.filter_param())?;
    let prompt = filter.prompt();

    tracing::debug!(
        data_id = message.data_id,
        prompt_type = ?prompt.prompt_type,
        points = prompt.points.len(),
        "Built interactive request"
    );

    Ok(ModelRequest::single(
        InferenceRequest::new(message.data_id, url).with_prompt(prompt),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{PromptPoint, PromptType};
    use serde_json::{json, Value};

    fn message(filter: Value, content: Value) -> JobMessage {
        serde_json::from_value(json!({
            "dataId": 11,
            "modelId": 2,
            "modelSerialNo": 9001,
            "modelCode": "IMAGE_INTERACTIVE",
            "datasetId": 5,
            "url": "http://model/predict",
            "resultFilterParam": filter,
            "dataInfo": {"id": 11, "content": content}
        }))
        .unwrap()
    }

    fn file(url: &str) -> Value {
        json!([{"type": "file", "file": {"id": 1, "url": url}}])
    }

    #[test]
    fn test_empty_filter_gives_no_prompt() {
        let request = build_interactive_request(&message(json!({}), file("http://minio/a.jpg"))).unwrap();
        assert_eq!(request.datas.len(), 1);
        let data = &request.datas[0];
        assert_eq!(data.id, 11);
        assert_eq!(data.url, "http://minio/a.jpg");
        assert!(data.points.is_empty());
        assert_eq!(data.prompt_type, None);
    }

    #[test]
    fn test_rect_conversion_is_stable() {
        let msg = message(
            json!({"interactiveData": {"type": "rect", "coordinates": {"x": 10, "y": 20, "width": 30, "height": 40}}}),
            file("http://minio/a.jpg"),
        );
        let first = build_interactive_request(&msg).unwrap();
        let second = build_interactive_request(&msg).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.datas[0].prompt_type, Some(PromptType::Rect));
        assert_eq!(
            first.datas[0].points,
            vec![PromptPoint::positive(10.0, 20.0), PromptPoint::positive(40.0, 60.0)]
        );
    }

    #[test]
    fn test_rect_without_coordinates_runs_without_prompt() {
        let msg = message(json!({"interactiveData": {"type": "rect"}}), file("http://minio/a.jpg"));
        let request = build_interactive_request(&msg).unwrap();
        assert!(request.datas[0].points.is_empty());
        assert_eq!(request.datas[0].prompt_type, None);
    }

    #[test]
    fn test_directory_node_uses_first_nested_file() {
        let content = json!([{"type": "directory", "files": [{"type": "file", "file": {"url": "http://minio/f0.jpg"}}]}]);
        let request = build_interactive_request(&message(json!({}), content)).unwrap();
        assert_eq!(request.datas[0].url, "http://minio/f0.jpg");
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = build_interactive_request(&message(json!({}), json!([]))).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        let err = build_interactive_request(&message(json!({}), file(""))).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: file url is empty");
    }

    #[test]
    fn test_request_wire_shape() {
        let msg = message(json!({"points": [{"x": 1, "y": 2, "positive": false}]}), file("http://minio/a.jpg"));
        let body = serde_json::to_value(build_interactive_request(&msg).unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"datas": [{"id": 11, "url": "http://minio/a.jpg", "type": "points",
                              "points": [{"x": 1.0, "y": 2.0, "positive": false}]}]})
        );
    }
}
