//! Geometry - 标注共享的几何值对象

use serde::{Deserialize, Serialize};

/// 二维点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 三维点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 三维尺寸
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 三维旋转（欧拉角）
///
/// - pitch: 绕 X 轴
/// - yaw: 绕 Y 轴
/// - roll: 绕 Z 轴
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation3D {
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub roll: f64,
}

impl Rotation3D {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// 三维框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    #[serde(rename = "center3D")]
    pub center: Point3D,
    #[serde(rename = "size3D")]
    pub size: Size3D,
    #[serde(rename = "rotation3D")]
    pub rotation: Rotation3D,
}
