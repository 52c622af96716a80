//! Annotation Context - Value Objects

use serde::{Deserialize, Serialize};

/// 推理结果代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    Ok,
    Error,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Ok => "OK",
            ResultCode::Error => "ERROR",
        }
    }
}

/// 标注对象来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Model,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Model => "MODEL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MODEL" => Some(SourceType::Model),
            _ => None,
        }
    }
}

/// 分类属性 - 统一后的 `{id, values}` 形式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationAttribute {
    pub id: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl ClassificationAttribute {
    pub fn new(id: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }
}

/// 数据级分类标注
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnnotation {
    pub classification_id: String,
    pub classification_attributes: Vec<ClassificationAttribute>,
}

/// 置信度范围 `[min, max]`，缺省为 `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ConfidenceRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl ConfidenceRange {
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Self {
        let default = Self::default();
        Self {
            min: min.unwrap_or(default.min),
            max: max.unwrap_or(default.max),
        }
    }

    /// 没有置信度的对象不参与过滤
    pub fn contains(&self, confidence: Option<f64>) -> bool {
        match confidence {
            Some(c) => self.min <= c && c <= self.max,
            None => true,
        }
    }
}
