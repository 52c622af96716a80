//! DTO - 线上负载模型
//!
//! 入站过滤参数、出站推理请求、远程响应

use serde::{Deserialize, Deserializer};
use serde_json::Value;

mod detection;
mod interactive;
mod request;
mod response;

pub use detection::{DetectionFilterParam, DetectionObject, DetectionResponse};
pub use interactive::{InteractiveData, InteractiveFilterParam, RectArea};
pub use request::{InferenceRequest, ModelRequest};
pub use response::{
    ApiResult, ClassificationAttributesShape, InteractiveResponse, IssClassAttributes, IssContour,
    IssResult, RawModelResponse, ResponseCode, WireDataAnnotation,
};

/// 置信度边界，数字或数字字符串；其他形式视为未设置
pub(crate) fn confidence_bound(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn deserialize_confidence_bound<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(confidence_bound))
}
