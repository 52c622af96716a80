//! Detection Handler - 图像检测 / 点云检测

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{HandlerContext, MetricsInput, ModelHandler};
use crate::application::converters::{build_detection_annotation, build_detection_request};
use crate::application::dto::{DetectionFilterParam, DetectionResponse, RawModelResponse};
use crate::application::error::PipelineError;
use crate::application::ports::ModelDatasetResult;
use crate::domain::annotation::{AnnotatedObject, AnnotationObject, AnnotationResult, RECTANGLE_OBJECT_TYPE};
use crate::domain::job::{JobMessage, ModelCode};

/// 检测 Handler，同一实现服务图像检测与点云检测两个模型代码
pub struct DetectionHandler {
    ctx: HandlerContext,
    model_code: ModelCode,
}

impl DetectionHandler {
    pub fn new(ctx: HandlerContext, model_code: ModelCode) -> Self {
        Self { ctx, model_code }
    }
}

fn is_rectangle(object: &AnnotatedObject) -> bool {
    object.object_type.eq_ignore_ascii_case(RECTANGLE_OBJECT_TYPE)
}

/// 评估记录 `{id, objects: [{points}]}`
fn metrics_line<'a>(data_id: i64, objects: impl Iterator<Item = &'a AnnotatedObject>) -> String {
    let objects: Vec<Value> = objects.map(|o| json!({ "points": o.points })).collect();
    json!({ "id": data_id, "objects": objects }).to_string()
}

#[async_trait]
impl ModelHandler for DetectionHandler {
    fn model_code(&self) -> ModelCode {
        self.model_code
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    async fn call_remote_service(&self, message: &JobMessage) -> Result<RawModelResponse, PipelineError> {
        let request = build_detection_request(message)?;
        self.ctx.invoke(&request, &message.url).await
    }

    async fn model_run(&self, message: &JobMessage) -> Result<AnnotationResult, PipelineError> {
        tracing::info!(
            data_id = message.data_id,
            model_serial_no = message.model_serial_no,
            model_code = %self.model_code,
            "Start detection model run"
        );
        let filter = DetectionFilterParam::from_map(&message.filter_param())
            .map_err(|e| PipelineError::validation(format!("invalid filter param: {}", e)))?;
        let raw = self.call_with_retry(message).await?;
        let class_map = self.load_class_map(message.model_id).await;
        let typed = raw
            .first_item::<DetectionResponse>()
            .map_err(|e| PipelineError::malformed(e.to_string()))?;
        Ok(build_detection_annotation(typed, &class_map, &filter))
    }

    /// 只评估二维矩形对象；失败的推理结果被跳过
    fn assemble_metrics_input(
        &self,
        results: &[ModelDatasetResult],
        annotations: &[AnnotationObject],
    ) -> MetricsInput {
        let mut ground_truth: BTreeMap<i64, Vec<AnnotatedObject>> = BTreeMap::new();
        for annotation in annotations {
            match serde_json::from_value::<AnnotatedObject>(annotation.class_attributes.clone()) {
                Ok(object) if is_rectangle(&object) => ground_truth.entry(annotation.data_id).or_default().push(object),
                Ok(_) => {}
                Err(e) => tracing::debug!(data_id = annotation.data_id, error = %e, "Skipping unparseable annotation"),
            }
        }

        let mut input = MetricsInput::default();
        for result in results.iter().filter(|r| r.is_success) {
            let prediction = match serde_json::from_value::<AnnotationResult>(result.model_result.clone()) {
                Ok(prediction) => prediction,
                Err(e) => {
                    tracing::warn!(data_id = result.data_id, error = %e, "Skipping unparseable model result");
                    continue;
                }
            };
            let truth = ground_truth.get(&result.data_id).map(Vec::as_slice).unwrap_or_default();
            input.ground_truth.push(metrics_line(result.data_id, truth.iter()));
            input
                .predictions
                .push(metrics_line(result.data_id, prediction.objects.iter().filter(|o| is_rectangle(o))));
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{fixture, job};
    use crate::application::ports::{ModelClass, ModelClassRepositoryPort, ModelRunRepositoryPort};
    use crate::domain::annotation::{generate_dedup_key, CUBOID_OBJECT_TYPE};
    use crate::domain::geometry::Point2D;
    use chrono::Utc;

    #[tokio::test]
    async fn test_filters_and_resolves_classes() {
        let f = fixture();
        f.runs.create_run(2, 9001, 5).await.unwrap();
        f.classes
            .save(&ModelClass { model_id: 2, code: "car".into(), name: "Car".into() })
            .await
            .unwrap();
        f.caller.push_json(json!({"code": "OK", "data": [{"id": 11, "objects": [
            {"label": "car", "confidence": 0.95, "leftTopX": 0, "leftTopY": 0, "rightBottomX": 4, "rightBottomY": 4},
            {"label": "car", "confidence": 0.1, "leftTopX": 1, "leftTopY": 1, "rightBottomX": 2, "rightBottomY": 2}
        ]}]}));
        let handler = DetectionHandler::new(f.ctx.clone(), ModelCode::ImageDetection);
        let message = job("IMAGE_DETECTION", json!({"minConfidence": "0.5"}));

        assert!(handler.handle_data_model_run(&message).await);
        let stored = f.store.objects.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].class_attributes["modelClass"], "Car");
        assert_eq!(stored[0].class_attributes["type"], "RECTANGLE");
        assert!(f.caller.requests()[0].0.datas[0].points.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_filter_param_is_validation_error() {
        let f = fixture();
        let handler = DetectionHandler::new(f.ctx.clone(), ModelCode::LidarDetection);
        let err = handler
            .model_run(&job("LIDAR_DETECTION", json!({"classes": "car"})))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(f.caller.call_count(), 0);
    }

    #[test]
    fn test_assemble_metrics_input() {
        let f = fixture();
        let handler = DetectionHandler::new(f.ctx.clone(), ModelCode::ImageDetection);

        let rect = AnnotatedObject::polygon(RECTANGLE_OBJECT_TYPE, vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)]);
        let cuboid = AnnotatedObject::polygon(CUBOID_OBJECT_TYPE, vec![]);
        let prediction = AnnotationResult::success(Some(11), vec![rect.clone(), cuboid]);

        let results = vec![
            ModelDatasetResult {
                model_id: 2,
                model_serial_no: 9001,
                data_id: 11,
                dataset_id: 5,
                result_filter_param: None,
                model_result: serde_json::to_value(&prediction).unwrap(),
                is_success: true,
                error_message: None,
                updated_at: Utc::now(),
            },
            ModelDatasetResult {
                data_id: 12,
                is_success: false,
                model_result: serde_json::to_value(AnnotationResult::failure("x")).unwrap(),
                ..results_template()
            },
        ];
        let annotations = vec![
            AnnotationObject::from_model(5, 11, 1, generate_dedup_key(9001, 11, 0), &rect).unwrap(),
        ];

        let input = handler.assemble_metrics_input(&results, &annotations);
        assert_eq!(input.predictions.len(), 1);
        let predicted: Value = serde_json::from_str(&input.predictions[0]).unwrap();
        assert_eq!(predicted["id"], 11);
        assert_eq!(predicted["objects"].as_array().unwrap().len(), 1);
        let truth: Value = serde_json::from_str(&input.ground_truth[0]).unwrap();
        assert_eq!(truth["objects"][0]["points"][1]["x"], 1.0);
    }

    fn results_template() -> ModelDatasetResult {
        ModelDatasetResult {
            model_id: 2,
            model_serial_no: 9001,
            data_id: 0,
            dataset_id: 5,
            result_filter_param: None,
            model_result: Value::Null,
            is_success: true,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}
