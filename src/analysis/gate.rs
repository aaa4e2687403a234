//! 动作质量门
//!
//! 两道独立检查：
//! - 非深蹲姿态（举手跳舞、体前屈、几何退化）直接拒绝，整帧不改变任何状态；
//! - 深蹲质量多数表决（深度、受控、对称，可选膝关节对齐），未通过的帧不推进
//!   状态机也不计分，但不会清掉当前这次深蹲已累积的进度。

use serde::Serialize;

use crate::analysis::angle::Point;
use crate::analysis::config::{AnalyzerConfig, GateConfig, KneeAlignmentConfig};
use crate::analysis::landmarks::PoseSnapshot;

/// 非深蹲姿态的拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PostureRejection {
    /// 膝角为 0 哨兵值或低到不可能
    ImplausibleKneeAngle,
    /// 手腕明显高于肩部
    WristAboveShoulder,
    /// 躯干前倾过大
    ExcessiveTorsoLean,
}

/// 膝关节对齐情况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KneeAlignment {
    /// 任一侧膝盖相对脚踝水平偏移超出范围
    pub knee_overshoot: bool,
    /// 两膝间距相对两髋间距塌缩（膝内扣）
    pub valgus: bool,
}

impl KneeAlignment {
    pub fn is_good(&self) -> bool {
        !self.knee_overshoot && !self.valgus
    }
}

pub fn assess_knee_alignment(pose: &PoseSnapshot, config: &KneeAlignmentConfig) -> KneeAlignment {
    let knee_overshoot = (pose.left_knee.x - pose.left_ankle.x).abs() > config.ankle_margin
        || (pose.right_knee.x - pose.right_ankle.x).abs() > config.ankle_margin;

    let hip_width = pose.left_hip.distance(&pose.right_hip);
    let knee_width = pose.left_knee.distance(&pose.right_knee);
    let valgus =
        hip_width >= config.valgus_min_hip_width && knee_width < hip_width * config.valgus_ratio;

    KneeAlignment {
        knee_overshoot,
        valgus,
    }
}

/// 最近一次计算的质量检查结果，用于诊断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityFlags {
    pub has_proper_depth: bool,
    pub has_controlled_movement: bool,
    pub has_symmetric_movement: bool,
    /// 未纳入表决时为 None
    pub has_good_knee_alignment: Option<bool>,
}

impl QualityFlags {
    pub fn passed_count(&self) -> usize {
        [
            self.has_proper_depth,
            self.has_controlled_movement,
            self.has_symmetric_movement,
            self.has_good_knee_alignment.unwrap_or(false),
        ]
        .iter()
        .filter(|&&passed| passed)
        .count()
    }
}

#[derive(Debug, Clone)]
pub struct MotionQualityGate {
    config: GateConfig,
    bottom_angle: f64,
}

impl MotionQualityGate {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            config: config.gate.clone(),
            bottom_angle: config.phase.bottom_angle,
        }
    }

    /// 非深蹲姿态检查，在平滑之前执行
    pub fn check_posture(
        &self,
        pose: &PoseSnapshot,
        raw_knee_angle: f64,
    ) -> Result<(), PostureRejection> {
        if raw_knee_angle < self.config.min_plausible_knee_angle {
            return Err(PostureRejection::ImplausibleKneeAngle);
        }

        let margin = self.config.wrist_raise_margin;
        let wrist_raised = |wrist: Option<Point>, shoulder: Point| {
            wrist.is_some_and(|w| w.y < shoulder.y - margin)
        };
        if wrist_raised(pose.left_wrist, pose.left_shoulder)
            || wrist_raised(pose.right_wrist, pose.right_shoulder)
        {
            return Err(PostureRejection::WristAboveShoulder);
        }

        if pose.torso_lean() > self.config.max_torso_lean {
            return Err(PostureRejection::ExcessiveTorsoLean);
        }

        Ok(())
    }

    /// 多数表决
    pub fn evaluate(
        &self,
        pose: &PoseSnapshot,
        smoothed_knee_angle: f64,
        average_velocity: f64,
        alignment: &KneeAlignment,
    ) -> QualityFlags {
        QualityFlags {
            has_proper_depth: smoothed_knee_angle <= self.bottom_angle,
            has_controlled_movement: average_velocity < self.config.max_controlled_velocity,
            has_symmetric_movement: (pose.left_knee.y - pose.right_knee.y).abs()
                < self.config.max_knee_height_diff,
            has_good_knee_alignment: self
                .config
                .include_knee_alignment
                .then(|| alignment.is_good()),
        }
    }

    pub fn passes(&self, flags: &QualityFlags) -> bool {
        flags.passed_count() >= self.config.required_checks()
    }
}
