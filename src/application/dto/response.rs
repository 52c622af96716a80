//! 远程模型响应

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::annotation::ClassificationAttribute;
use crate::domain::geometry::Point2D;

/// 响应代码：文本（`"OK"`）或数字（`0` / `200`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseCode {
    Text(String),
    Number(i64),
}

impl ResponseCode {
    pub fn is_ok(&self) -> bool {
        match self {
            ResponseCode::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("OK") || s.eq_ignore_ascii_case("SUCCESS") || s == "0" || s == "200"
            }
            ResponseCode::Number(n) => *n == 0 || *n == 200,
        }
    }
}

/// 通用响应信封 `{code, message, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub code: ResponseCode,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

/// 未解析的模型响应，`data` 为每个推理目标一项
pub type RawModelResponse = ApiResult<Vec<Value>>;

impl RawModelResponse {
    /// 将 `data` 的每一项解析为具体响应类型
    pub fn typed_items<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.data
            .iter()
            .flatten()
            .map(|item| serde_json::from_value(item.clone()))
            .collect()
    }

    /// 取第一项作为单目标响应，信封代码和消息保留
    pub fn first_item<T: DeserializeOwned>(&self) -> Result<ApiResult<T>, serde_json::Error> {
        let data = match self.data.as_ref().and_then(|items| items.first()) {
            Some(item) => Some(serde_json::from_value(item.clone())?),
            None => None,
        };
        Ok(ApiResult {
            code: self.code.clone(),
            message: self.message.clone(),
            data,
        })
    }
}

// ============================================================================
// Classification attributes
// ============================================================================

/// 分类属性的两种线上形态
///
/// - 单个对象: `{id, values}`（以 `id` 键判别）
/// - 数组: `[{id, values}, ...]` 或 `{values: [{id, values}, ...]}`
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationAttributesShape {
    Single(ClassificationAttribute),
    List(Vec<ClassificationAttribute>),
}

impl ClassificationAttributesShape {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Object(map) if map.contains_key("id") => Ok(Self::Single(attribute_from_object(map))),
            Value::Object(map) => Ok(Self::List(match map.get("values") {
                Some(Value::Array(items)) => attributes_from_array(items),
                _ => Vec::new(),
            })),
            Value::Array(items) => Ok(Self::List(attributes_from_array(items))),
            other => Err(format!("unexpected classificationAttributes shape: {}", other)),
        }
    }

    /// 统一为有序列表
    pub fn into_attributes(self) -> Vec<ClassificationAttribute> {
        match self {
            Self::Single(attribute) => vec![attribute],
            Self::List(attributes) => attributes,
        }
    }
}

impl<'de> Deserialize<'de> for ClassificationAttributesShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(de::Error::custom)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn attribute_from_object(map: &Map<String, Value>) -> ClassificationAttribute {
    let id = map.get("id").and_then(scalar_to_string).unwrap_or_default();
    let values = match map.get("values") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    };
    ClassificationAttribute::new(id, values)
}

/// 非对象元素被跳过
fn attributes_from_array(items: &[Value]) -> Vec<ClassificationAttribute> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(attribute_from_object)
        .collect()
}

// ============================================================================
// Interactive (ISS) response
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDataAnnotation {
    #[serde(default)]
    pub classification_id: Option<String>,
    #[serde(default)]
    pub classification_attributes: Option<ClassificationAttributesShape>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssContour {
    #[serde(default)]
    pub points: Vec<Point2D>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub iss_metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssClassAttributes {
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub class_id: Option<Value>,
    #[serde(default)]
    pub contour: Option<IssContour>,
}

/// 交互式分割的单个结果对象
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssResult {
    #[serde(default)]
    pub class_attributes: Option<IssClassAttributes>,
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveResponse {
    /// 数据 ID
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub model_code: Option<String>,
    #[serde(default)]
    pub data_annotations: Vec<WireDataAnnotation>,
    #[serde(default)]
    pub objects: Vec<IssResult>,
}
