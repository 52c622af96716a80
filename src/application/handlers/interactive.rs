//! Image Interactive Handler - 交互式分割（SAM）

use async_trait::async_trait;

use super::{HandlerContext, ModelHandler};
use crate::application::converters::{build_interactive_annotation, build_interactive_request};
use crate::application::dto::{InteractiveResponse, RawModelResponse};
use crate::application::error::PipelineError;
use crate::domain::annotation::AnnotationResult;
use crate::domain::job::{JobMessage, ModelCode};

pub struct ImageInteractiveHandler {
    ctx: HandlerContext,
}

impl ImageInteractiveHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ModelHandler for ImageInteractiveHandler {
    fn model_code(&self) -> ModelCode {
        ModelCode::ImageInteractive
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    async fn call_remote_service(&self, message: &JobMessage) -> Result<RawModelResponse, PipelineError> {
        let request = build_interactive_request(message)?;
        self.ctx.invoke(&request, &message.url).await
    }

    async fn model_run(&self, message: &JobMessage) -> Result<AnnotationResult, PipelineError> {
        tracing::info!(
            data_id = message.data_id,
            model_serial_no = message.model_serial_no,
            "Start interactive model run"
        );
        let raw = self.call_with_retry(message).await?;
        let class_map = self.load_class_map(message.model_id).await;
        let typed = raw
            .first_item::<InteractiveResponse>()
            .map_err(|e| PipelineError::malformed(e.to_string()))?;
        build_interactive_annotation(typed, &class_map)
    }
}
