//! Handler Registry - 模型代码到 Handler 的静态注册表
//!
//! 进程启动时构建一次，之后只读，可无锁并发查询

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::{DetectionHandler, HandlerContext, ImageInteractiveHandler, ImageTrackingHandler, ModelHandler};
use crate::domain::job::ModelCode;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate handler registration for model code {0}")]
    Duplicate(ModelCode),

    #[error("Handler registered under {registered} reports model code {reported}")]
    CodeMismatch {
        registered: ModelCode,
        reported: ModelCode,
    },
}

/// Handler 构造函数
pub type HandlerFactory = fn(HandlerContext) -> Arc<dyn ModelHandler>;

fn image_interactive(ctx: HandlerContext) -> Arc<dyn ModelHandler> {
    Arc::new(ImageInteractiveHandler::new(ctx))
}

fn image_detection(ctx: HandlerContext) -> Arc<dyn ModelHandler> {
    Arc::new(DetectionHandler::new(ctx, ModelCode::ImageDetection))
}

fn lidar_detection(ctx: HandlerContext) -> Arc<dyn ModelHandler> {
    Arc::new(DetectionHandler::new(ctx, ModelCode::LidarDetection))
}

fn image_tracking(ctx: HandlerContext) -> Arc<dyn ModelHandler> {
    Arc::new(ImageTrackingHandler::new(ctx))
}

/// 默认注册表
pub fn default_factories() -> Vec<(ModelCode, HandlerFactory)> {
    vec![
        (ModelCode::ImageInteractive, image_interactive as HandlerFactory),
        (ModelCode::ImageDetection, image_detection),
        (ModelCode::LidarDetection, lidar_detection),
        (ModelCode::ImageTracking, image_tracking),
    ]
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ModelCode, Arc<dyn ModelHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从注册表构建；重复注册立即失败
    pub fn from_factories(
        ctx: &HandlerContext,
        factories: &[(ModelCode, HandlerFactory)],
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (code, factory) in factories {
            let handler = factory(ctx.clone());
            if handler.model_code() != *code {
                return Err(RegistryError::CodeMismatch {
                    registered: *code,
                    reported: handler.model_code(),
                });
            }
            registry.register(handler)?;
        }
        Ok(registry)
    }

    pub fn with_defaults(ctx: &HandlerContext) -> Result<Self, RegistryError> {
        Self::from_factories(ctx, &default_factories())
    }

    pub fn register(&mut self, handler: Arc<dyn ModelHandler>) -> Result<(), RegistryError> {
        let code = handler.model_code();
        if self.handlers.contains_key(&code) {
            return Err(RegistryError::Duplicate(code));
        }
        tracing::debug!(model_code = %code, "Registered model handler");
        self.handlers.insert(code, handler);
        Ok(())
    }

    pub fn get(&self, code: ModelCode) -> Option<&Arc<dyn ModelHandler>> {
        self.handlers.get(&code)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn model_codes(&self) -> Vec<ModelCode> {
        let mut codes: Vec<ModelCode> = self.handlers.keys().copied().collect();
        codes.sort_by_key(|c| c.as_str());
        codes
    }
}
