//! Job Context - Value Objects

use serde::{Deserialize, Serialize};

/// 模型代码 - 决定消息由哪个 Handler 处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelCode {
    /// 图像检测（COCO 80 类）
    ImageDetection,
    /// 点云检测（预标注）
    LidarDetection,
    /// 图像交互式分割（SAM）
    ImageInteractive,
    /// 图像跟踪
    ImageTracking,
}

impl ModelCode {
    pub const ALL: [ModelCode; 4] = [
        ModelCode::ImageDetection,
        ModelCode::LidarDetection,
        ModelCode::ImageInteractive,
        ModelCode::ImageTracking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCode::ImageDetection => "IMAGE_DETECTION",
            ModelCode::LidarDetection => "LIDAR_DETECTION",
            ModelCode::ImageInteractive => "IMAGE_INTERACTIVE",
            ModelCode::ImageTracking => "IMAGE_TRACKING",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == s)
    }
}

impl std::fmt::Display for ModelCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 交互提示类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Points,
    Rect,
}

/// 交互提示点
///
/// positive = true 表示前景点，false 表示背景点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromptPoint {
    pub x: f64,
    pub y: f64,
    pub positive: bool,
}

impl PromptPoint {
    pub fn new(x: f64, y: f64, positive: bool) -> Self {
        Self { x, y, positive }
    }

    pub fn positive(x: f64, y: f64) -> Self {
        Self::new(x, y, true)
    }
}

/// 交互提示
///
/// 不变量: 矩形提示已归一化为左上、右下两个正样本点
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractivePrompt {
    pub prompt_type: Option<PromptType>,
    pub points: Vec<PromptPoint>,
}

impl InteractivePrompt {
    pub fn points(points: Vec<PromptPoint>) -> Self {
        Self {
            prompt_type: Some(PromptType::Points),
            points,
        }
    }

    /// 将矩形 `{x, y, width, height}` 转换为两个角点
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            prompt_type: Some(PromptType::Rect),
            points: vec![
                PromptPoint::positive(x, y),
                PromptPoint::positive(x + width, y + height),
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_code_round_trip_str() {
        for code in ModelCode::ALL {
            assert_eq!(ModelCode::from_str(code.as_str()), Some(code));
        }
        assert_eq!(ModelCode::from_str("TEXT_CLASSIFICATION"), None);
    }

    #[test]
    fn test_model_code_serde_matches_as_str() {
        let json = serde_json::to_string(&ModelCode::ImageInteractive).unwrap();
        assert_eq!(json, "\"IMAGE_INTERACTIVE\"");
        let code: ModelCode = serde_json::from_str("\"LIDAR_DETECTION\"").unwrap();
        assert_eq!(code, ModelCode::LidarDetection);
    }

    #[test]
    fn test_rect_prompt_corners() {
        let prompt = InteractivePrompt::rect(10.0, 20.0, 30.0, 40.0);
        assert_eq!(prompt.prompt_type, Some(PromptType::Rect));
        assert_eq!(
            prompt.points,
            vec![PromptPoint::positive(10.0, 20.0), PromptPoint::positive(40.0, 60.0)]
        );
    }
}
