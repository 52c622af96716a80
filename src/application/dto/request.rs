//! 出站推理请求

use serde::{Deserialize, Serialize};

use crate::domain::job::{InteractivePrompt, PromptPoint, PromptType};

/// 单个推理目标，完全由 JobMessage 推导，不持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub id: i64,
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<PromptType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PromptPoint>,
}

impl InferenceRequest {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            prompt_type: None,
            points: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: InteractivePrompt) -> Self {
        self.prompt_type = prompt.prompt_type;
        self.points = prompt.points;
        self
    }
}

/// 请求体 `{datas: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub datas: Vec<InferenceRequest>,
}

impl ModelRequest {
    pub fn single(request: InferenceRequest) -> Self {
        Self { datas: vec![request] }
    }
}
