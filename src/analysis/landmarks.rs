//! 人体关键点
//!
//! 检测器按 MediaPipe Pose 的 33 点顺序输出关键点。这里每帧只解析一次，
//! 把需要的点取成具名字段（`PoseSnapshot`），之后的计算不再出现下标。

use serde::{Deserialize, Serialize};

use crate::analysis::angle::{angle_between, torso_lean, Point};

/// MediaPipe Pose 关键点总数
pub const POSE_LANDMARK_COUNT: usize = 33;

fn default_visibility() -> f64 {
    1.0
}

/// 单个关键点（归一化坐标）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// 可见度 (0.0 - 1.0)，检测器未提供时视为完全可见
    #[serde(default = "default_visibility")]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn is_usable(&self, min_visibility: f64) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.visibility >= min_visibility
    }
}

/// 分析用到的身体部位及其 MediaPipe 下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyPoint {
    LeftShoulder,
    RightShoulder,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPoint {
    /// 缺失时整帧跳过的关键点
    pub const REQUIRED: [BodyPoint; 8] = [
        BodyPoint::LeftShoulder,
        BodyPoint::RightShoulder,
        BodyPoint::LeftHip,
        BodyPoint::RightHip,
        BodyPoint::LeftKnee,
        BodyPoint::RightKnee,
        BodyPoint::LeftAnkle,
        BodyPoint::RightAnkle,
    ];

    pub fn index(self) -> usize {
        match self {
            BodyPoint::LeftShoulder => 11,
            BodyPoint::RightShoulder => 12,
            BodyPoint::LeftWrist => 15,
            BodyPoint::RightWrist => 16,
            BodyPoint::LeftHip => 23,
            BodyPoint::RightHip => 24,
            BodyPoint::LeftKnee => 25,
            BodyPoint::RightKnee => 26,
            BodyPoint::LeftAnkle => 27,
            BodyPoint::RightAnkle => 28,
        }
    }
}

/// 一帧检测结果，按 MediaPipe 下标排列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn get(&self, point: BodyPoint) -> Option<&Landmark> {
        self.landmarks.get(point.index())
    }

    pub fn set(&mut self, point: BodyPoint, landmark: Landmark) {
        let index = point.index();
        if self.landmarks.len() <= index {
            self.landmarks
                .resize(POSE_LANDMARK_COUNT.max(index + 1), Landmark::new(0.0, 0.0, 0.0));
        }
        self.landmarks[index] = landmark;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter()
    }

    fn usable(&self, point: BodyPoint, min_visibility: f64) -> Option<Point> {
        self.get(point)
            .filter(|lm| lm.is_usable(min_visibility))
            .map(Landmark::point)
    }

    fn require(&self, point: BodyPoint, min_visibility: f64) -> Result<Point, BodyPoint> {
        self.usable(point, min_visibility).ok_or(point)
    }

    /// 解析出具名关键点；第一个缺失或可见度不足的必需点作为错误返回
    pub fn resolve(&self, min_visibility: f64) -> Result<PoseSnapshot, BodyPoint> {
        Ok(PoseSnapshot {
            left_shoulder: self.require(BodyPoint::LeftShoulder, min_visibility)?,
            right_shoulder: self.require(BodyPoint::RightShoulder, min_visibility)?,
            left_hip: self.require(BodyPoint::LeftHip, min_visibility)?,
            right_hip: self.require(BodyPoint::RightHip, min_visibility)?,
            left_knee: self.require(BodyPoint::LeftKnee, min_visibility)?,
            right_knee: self.require(BodyPoint::RightKnee, min_visibility)?,
            left_ankle: self.require(BodyPoint::LeftAnkle, min_visibility)?,
            right_ankle: self.require(BodyPoint::RightAnkle, min_visibility)?,
            left_wrist: self.usable(BodyPoint::LeftWrist, min_visibility),
            right_wrist: self.usable(BodyPoint::RightWrist, min_visibility),
        })
    }
}

/// 单帧解析后的具名关键点。手腕是可选的，只用于排除举手动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSnapshot {
    pub left_shoulder: Point,
    pub right_shoulder: Point,
    pub left_hip: Point,
    pub right_hip: Point,
    pub left_knee: Point,
    pub right_knee: Point,
    pub left_ankle: Point,
    pub right_ankle: Point,
    pub left_wrist: Option<Point>,
    pub right_wrist: Option<Point>,
}

impl PoseSnapshot {
    pub fn shoulder(&self) -> Point {
        self.left_shoulder.midpoint(&self.right_shoulder)
    }

    pub fn hip(&self) -> Point {
        self.left_hip.midpoint(&self.right_hip)
    }

    pub fn knee(&self) -> Point {
        self.left_knee.midpoint(&self.right_knee)
    }

    pub fn ankle(&self) -> Point {
        self.left_ankle.midpoint(&self.right_ankle)
    }

    /// 髋-膝-踝在膝部的夹角，站直约 180°
    pub fn knee_angle(&self) -> f64 {
        angle_between(self.hip(), self.knee(), self.ankle())
    }

    pub fn torso_lean(&self) -> f64 {
        torso_lean(self.shoulder(), self.hip())
    }
}
