//! Image Tracking Handler - 图像序列跟踪

use async_trait::async_trait;

use super::{HandlerContext, ModelHandler};
use crate::application::converters::{build_tracking_annotation, build_tracking_request};
use crate::application::dto::RawModelResponse;
use crate::application::error::PipelineError;
use crate::domain::annotation::AnnotationResult;
use crate::domain::job::{JobMessage, ModelCode};

pub struct ImageTrackingHandler {
    ctx: HandlerContext,
}

impl ImageTrackingHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ModelHandler for ImageTrackingHandler {
    fn model_code(&self) -> ModelCode {
        ModelCode::ImageTracking
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    async fn call_remote_service(&self, message: &JobMessage) -> Result<RawModelResponse, PipelineError> {
        let request = build_tracking_request(message)?;
        tracing::debug!(data_id = message.data_id, frames = request.datas.len(), "Built tracking request");
        self.ctx.invoke(&request, &message.url).await
    }

    async fn model_run(&self, message: &JobMessage) -> Result<AnnotationResult, PipelineError> {
        tracing::info!(
            data_id = message.data_id,
            model_serial_no = message.model_serial_no,
            "Start tracking model run"
        );
        let raw = self.call_with_retry(message).await?;
        let class_map = self.load_class_map(message.model_id).await;
        build_tracking_annotation(&raw, message.data_id, &class_map)
    }
}
