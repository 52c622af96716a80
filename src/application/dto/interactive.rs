//! 交互式模型入站参数（resultFilterParam）

use serde::Deserialize;
use serde_json::{Map, Value};

use super::confidence_bound;
use crate::domain::annotation::ConfidenceRange;
use crate::domain::job::{InteractivePrompt, JobError, PromptPoint};

/// 线上提示点，`positive` 缺省为 true
#[derive(Debug, Clone, Copy, Deserialize)]
struct WirePoint {
    x: f64,
    y: f64,
    #[serde(default)]
    positive: Option<bool>,
}

impl From<WirePoint> for PromptPoint {
    fn from(p: WirePoint) -> Self {
        PromptPoint::new(p.x, p.y, p.positive.unwrap_or(true))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RectArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// interactiveData，按 `type` 字段判别
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveData {
    Rect(RectArea),
    Points(Vec<PromptPoint>),
}

impl InteractiveData {
    /// 未知类型、缺失或无法解析的坐标都返回 None，不产生提示
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        match map.get("type").and_then(Value::as_str).map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("rect") => {
                // 矩形可以放在 coordinates 子对象里，也可以直接内联
                let source = match map.get("coordinates") {
                    Some(Value::Object(coordinates)) => coordinates,
                    _ => map,
                };
                match serde_json::from_value::<RectArea>(Value::Object(source.clone())) {
                    Ok(rect) => Some(Self::Rect(rect)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring interactive rect without valid coordinates");
                        None
                    }
                }
            }
            Some(t) if t.eq_ignore_ascii_case("points") => match parse_points(map.get("points")) {
                Ok(points) => Some(Self::Points(points)),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring interactive points that cannot be parsed");
                    None
                }
            },
            _ => None,
        }
    }
}

fn parse_points(value: Option<&Value>) -> Result<Vec<PromptPoint>, JobError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value::<Vec<WirePoint>>(v.clone())
            .map(|points| points.into_iter().map(PromptPoint::from).collect())
            .map_err(|e| JobError::InvalidPromptPoint(e.to_string())),
    }
}

/// 交互式模型过滤参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractiveFilterParam {
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
    /// 显式点列表
    pub points: Vec<PromptPoint>,
    /// 仅在没有显式点时解析
    pub interactive_data: Option<InteractiveData>,
}

impl InteractiveFilterParam {
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, JobError> {
        let points = parse_points(map.get("points"))?;
        let interactive_data = if points.is_empty() {
            map.get("interactiveData").and_then(InteractiveData::from_value)
        } else {
            None
        };
        Ok(Self {
            min_confidence: map.get("minConfidence").and_then(confidence_bound),
            max_confidence: map.get("maxConfidence").and_then(confidence_bound),
            points,
            interactive_data,
        })
    }

    pub fn confidence_range(&self) -> ConfidenceRange {
        ConfidenceRange::from_bounds(self.min_confidence, self.max_confidence)
    }

    /// 提取交互提示，取第一个匹配的来源，不合并:
    /// 1. 显式 `points`
    /// 2. `interactiveData` 矩形
    /// 3. `interactiveData` 点列表
    pub fn prompt(&self) -> InteractivePrompt {
        if !self.points.is_empty() {
            return InteractivePrompt::points(self.points.clone());
        }
        match &self.interactive_data {
            Some(InteractiveData::Rect(r)) => InteractivePrompt::rect(r.x, r.y, r.width, r.height),
            Some(InteractiveData::Points(points)) if !points.is_empty() => {
                InteractivePrompt::points(points.clone())
            }
            _ => InteractivePrompt::default(),
        }
    }
}
