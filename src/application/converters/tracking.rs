//! 跟踪模型请求构建与响应转换

use std::collections::HashMap;

use super::detection::{mean_confidence, to_annotated_object};
use crate::application::dto::{DetectionResponse, InferenceRequest, ModelRequest, RawModelResponse};
use crate::application::error::PipelineError;
use crate::application::ports::ModelClass;
use crate::domain::annotation::AnnotationResult;
use crate::domain::job::{JobError, JobMessage};

/// 跟踪请求：内容中每个文件节点（帧）一个推理目标
///
/// 目标 ID 取文件 ID，缺失时使用数据 ID
pub fn build_tracking_request(message: &JobMessage) -> Result<ModelRequest, PipelineError> {
    let frames = message.require_data_info()?.frame_files();
    if frames.is_empty() {
        return Err(JobError::FileNotFound.into());
    }
    Ok(ModelRequest {
        datas: frames
            .into_iter()
            .map(|(file_id, url)| InferenceRequest::new(file_id.unwrap_or(message.data_id), url))
            .collect(),
    })
}

/// 合并所有帧的跟踪对象；不做置信度过滤
pub fn build_tracking_annotation(
    raw: &RawModelResponse,
    data_id: i64,
    class_map: &HashMap<String, ModelClass>,
) -> Result<AnnotationResult, PipelineError> {
    if !raw.is_ok() {
        return Ok(AnnotationResult::failure(raw.message()));
    }
    let frames: Vec<DetectionResponse> = raw
        .typed_items()
        .map_err(|e| PipelineError::malformed(format!("tracking frame: {}", e)))?;

    let mut objects = Vec::new();
    for frame in &frames {
        for object in &frame.objects {
            match to_annotated_object(object, class_map) {
                Some(mut annotated) => {
                    annotated.track_id = object.track_id.clone();
                    annotated.track_name = object.track_name.clone();
                    objects.push(annotated);
                }
                None => tracing::warn!(frame_id = ?frame.id, "Dropping tracking object without geometry"),
            }
        }
    }

    let confidence = mean_confidence(&objects);
    Ok(AnnotationResult::success(Some(data_id), objects).with_confidence(confidence))
}
