//! 关节角度计算
//!
//! 所有上层角度（膝关节屈曲角、躯干前倾角）都由 `angle_between` 这一个原语构成。

use serde::{Deserialize, Serialize};

const MIN_VECTOR_LENGTH: f64 = 1e-9;

/// 归一化图像坐标中的二维点（原点左上，y 向下）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// 正上方 `length` 处的点，用作躯干角的竖直参考
    pub fn above(&self, length: f64) -> Point {
        Point::new(self.x, self.y - length)
    }
}

/// 以 `b` 为顶点，射线 b→a 与 b→c 的夹角（度），范围 [0, 180]
///
/// 任一向量长度为零时返回 0，调用方把 0° 视为不可信的几何结果。
pub fn angle_between(a: Point, b: Point, c: Point) -> f64 {
    let v1 = (a.x - b.x, a.y - b.y);
    let v2 = (c.x - b.x, c.y - b.y);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 < MIN_VECTOR_LENGTH || mag2 < MIN_VECTOR_LENGTH {
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    // 浮点误差可能让余弦略超出 [-1, 1]
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// 躯干前倾角：肩-髋连线与髋部竖直向上方向的夹角
pub fn torso_lean(shoulder: Point, hip: Point) -> f64 {
    angle_between(shoulder, hip, hip.above(1.0))
}
