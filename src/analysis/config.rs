use serde::{Deserialize, Serialize};

use crate::analysis::error::AnalysisError;

/// 膝角平滑与速度估计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmoothingConfig {
    /// 膝角滑动平均窗口（帧）。检测器抖动会造成单帧尖峰，3 帧足以压住
    pub angle_window: usize,
    /// 速度历史窗口（帧）
    pub velocity_window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            angle_window: 3,
            velocity_window: 5,
        }
    }
}

/// 阶段状态机阈值（度）
///
/// 必须满足 `bottom < descend <= stand` 且 `bottom < ascend < stand`，
/// 否则状态机要么永远完成不了一次深蹲，要么在阈值附近反复计数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseConfig {
    /// 高于此角度视为站直
    pub stand_angle: f64,
    /// 站立时低于等于此角度开始下蹲
    pub descend_angle: f64,
    /// 低于等于此角度视为到达底部
    pub bottom_angle: f64,
    /// 底部时高于此角度开始起身
    pub ascend_angle: f64,
    /// 确认底部所需的连续帧数
    pub min_bottom_hold_frames: u32,
    /// 一次有效深蹲在下蹲/底部/起身阶段的最少总帧数，过快的屈膝（如失去平衡）不计
    pub min_squat_duration_frames: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            stand_angle: 160.0,
            descend_angle: 150.0,
            bottom_angle: 120.0,
            ascend_angle: 125.0,
            min_bottom_hold_frames: 2,
            min_squat_duration_frames: 6,
        }
    }
}

/// 动作质量门
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    /// 必需关键点的最低可见度
    pub min_visibility: f64,
    /// 手腕高出肩部超过此值（归一化）视为举手/跳舞
    pub wrist_raise_margin: f64,
    /// 躯干前倾超过此角度视为弯腰、体前屈等非深蹲动作
    pub max_torso_lean: f64,
    /// 原始膝角低于此值视为几何退化（包括零向量时的 0° 哨兵值）
    pub min_plausible_knee_angle: f64,
    /// 平均速度低于此值（度/帧）视为受控动作
    pub max_controlled_velocity: f64,
    /// 左右膝高度差低于此值视为对称
    pub max_knee_height_diff: f64,
    /// 是否把膝关节对齐纳入多数表决
    pub include_knee_alignment: bool,
    /// 至少通过的检查项数；缺省为参与表决项的过半数（3 项取 2，4 项取 3）
    pub min_passing_checks: Option<usize>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.5,
            wrist_raise_margin: 0.1,
            max_torso_lean: 75.0,
            min_plausible_knee_angle: 30.0,
            max_controlled_velocity: 15.0,
            max_knee_height_diff: 0.05,
            include_knee_alignment: false,
            min_passing_checks: None,
        }
    }
}

impl GateConfig {
    pub fn active_checks(&self) -> usize {
        if self.include_knee_alignment {
            4
        } else {
            3
        }
    }

    /// 实际生效的通过门槛
    pub fn required_checks(&self) -> usize {
        self.min_passing_checks
            .unwrap_or(self.active_checks() / 2 + 1)
    }
}

/// 膝关节对齐判定，质量门与评分共用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KneeAlignmentConfig {
    /// 膝与踝水平偏移超过此值视为超伸/内收
    pub ankle_margin: f64,
    /// 两膝间距小于两髋间距的此比例视为内扣
    pub valgus_ratio: f64,
    /// 两髋间距低于此值时（纯侧面视角）不做内扣判断
    pub valgus_min_hip_width: f64,
}

impl Default for KneeAlignmentConfig {
    fn default() -> Self {
        Self {
            ankle_margin: 0.12,
            valgus_ratio: 0.7,
            valgus_min_hip_width: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreWeights {
    pub depth: f64,
    pub back_posture: f64,
    pub knee_alignment: f64,
    pub control: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            depth: 0.4,
            back_posture: 0.3,
            knee_alignment: 0.2,
            control: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.depth + self.back_posture + self.knee_alignment + self.control
    }
}

/// 逐帧分项评分参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    /// 膝角小于等于此值深度满分
    pub depth_full_angle: f64,
    /// 膝角大于等于此值深度零分
    pub depth_zero_angle: f64,
    pub back_ideal_min: f64,
    pub back_ideal_max: f64,
    /// 躯干过直时每度扣分
    pub back_under_penalty: f64,
    /// 躯干过度前倾时每度扣分
    pub back_over_penalty: f64,
    pub knee_overshoot_penalty: f64,
    pub valgus_penalty: f64,
    /// 平均速度超过此值开始扣控制分
    pub control_good_velocity: f64,
    /// 超过此值后扣分更陡
    pub control_bad_velocity: f64,
    pub control_good_penalty: f64,
    pub control_bad_penalty: f64,
    pub weights: ScoreWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            depth_full_angle: 60.0,
            depth_zero_angle: 160.0,
            back_ideal_min: 10.0,
            back_ideal_max: 50.0,
            back_under_penalty: 5.0,
            back_over_penalty: 3.0,
            knee_overshoot_penalty: 30.0,
            valgus_penalty: 20.0,
            control_good_velocity: 8.0,
            control_bad_velocity: 20.0,
            control_good_penalty: 2.5,
            control_bad_penalty: 5.0,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// 会话结束时至少需要的合格帧数，不足则报告“未检测到有效深蹲”
    pub min_qualifying_frames: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_qualifying_frames: 10,
        }
    }
}

/// 分析器的完整配置，所有字段都有默认值，零配置即可工作
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    pub smoothing: SmoothingConfig,
    pub phase: PhaseConfig,
    pub gate: GateConfig,
    pub knee_alignment: KneeAlignmentConfig,
    pub scoring: ScoringConfig,
    pub session: SessionConfig,
}

impl AnalyzerConfig {
    pub fn from_env(env_config: &crate::config::AnalyzerEnvConfig) -> Self {
        let mut config = Self::default();
        config.smoothing.angle_window = env_config.smoothing_window;
        config.gate.min_visibility = env_config.min_visibility;
        config.gate.include_knee_alignment = env_config.include_knee_alignment;
        config.gate.min_passing_checks = env_config.min_passing_checks;
        config.phase.min_squat_duration_frames = env_config.min_squat_duration_frames;
        config
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.smoothing.angle_window == 0 {
            return Err(AnalysisError::invalid_config("smoothing.angleWindow must be >= 1"));
        }
        if self.smoothing.velocity_window == 0 {
            return Err(AnalysisError::invalid_config("smoothing.velocityWindow must be >= 1"));
        }

        let p = &self.phase;
        for (name, value) in [
            ("phase.standAngle", p.stand_angle),
            ("phase.descendAngle", p.descend_angle),
            ("phase.bottomAngle", p.bottom_angle),
            ("phase.ascendAngle", p.ascend_angle),
        ] {
            if !(0.0..=180.0).contains(&value) {
                return Err(AnalysisError::invalid_config(format!(
                    "{name} must be in [0,180] (got {value})"
                )));
            }
        }
        if p.bottom_angle >= p.descend_angle {
            return Err(AnalysisError::invalid_config(
                "phase.bottomAngle must be below phase.descendAngle",
            ));
        }
        if p.descend_angle > p.stand_angle {
            return Err(AnalysisError::invalid_config(
                "phase.descendAngle must not exceed phase.standAngle",
            ));
        }
        if !(p.bottom_angle < p.ascend_angle && p.ascend_angle < p.stand_angle) {
            return Err(AnalysisError::invalid_config(
                "phase.ascendAngle must lie strictly between bottomAngle and standAngle",
            ));
        }
        if p.min_bottom_hold_frames == 0 {
            return Err(AnalysisError::invalid_config("phase.minBottomHoldFrames must be >= 1"));
        }

        let g = &self.gate;
        if !(0.0..=1.0).contains(&g.min_visibility) {
            return Err(AnalysisError::invalid_config("gate.minVisibility must be in [0,1]"));
        }
        if g.wrist_raise_margin < 0.0 || g.max_knee_height_diff <= 0.0 {
            return Err(AnalysisError::invalid_config("gate margins must be positive"));
        }
        if !(0.0..=180.0).contains(&g.max_torso_lean) {
            return Err(AnalysisError::invalid_config("gate.maxTorsoLean must be in [0,180]"));
        }
        if g.min_plausible_knee_angle >= p.bottom_angle {
            return Err(AnalysisError::invalid_config(
                "gate.minPlausibleKneeAngle must be below phase.bottomAngle",
            ));
        }
        if g.max_controlled_velocity <= 0.0 {
            return Err(AnalysisError::invalid_config("gate.maxControlledVelocity must be > 0"));
        }
        let required = g.required_checks();
        if required * 2 <= g.active_checks() || required > g.active_checks() {
            return Err(AnalysisError::invalid_config(format!(
                "gate.minPassingChecks must be a majority of the {} active checks (got {required})",
                g.active_checks()
            )));
        }

        let k = &self.knee_alignment;
        if k.ankle_margin < 0.0 || !(0.0..=1.0).contains(&k.valgus_ratio) {
            return Err(AnalysisError::invalid_config("invalid kneeAlignment thresholds"));
        }

        let s = &self.scoring;
        if s.depth_full_angle >= s.depth_zero_angle {
            return Err(AnalysisError::invalid_config(
                "scoring.depthFullAngle must be below scoring.depthZeroAngle",
            ));
        }
        if s.back_ideal_min > s.back_ideal_max {
            return Err(AnalysisError::invalid_config(
                "scoring.backIdealMin must not exceed scoring.backIdealMax",
            ));
        }
        if s.control_good_velocity > s.control_bad_velocity {
            return Err(AnalysisError::invalid_config(
                "scoring.controlGoodVelocity must not exceed scoring.controlBadVelocity",
            ));
        }
        let w = &s.weights;
        if w.depth < 0.0 || w.back_posture < 0.0 || w.knee_alignment < 0.0 || w.control < 0.0 {
            return Err(AnalysisError::invalid_config("scoring weights must be >= 0"));
        }
        let weight_sum = w.sum();
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(AnalysisError::invalid_config(format!(
                "scoring weights should sum to ~1.0 (got {weight_sum:.3})"
            )));
        }

        Ok(())
    }

    /// 把 camelCase 的部分覆盖合并到当前配置上，再校验
    pub fn with_overrides(&self, overrides: &serde_json::Value) -> Result<Self, AnalysisError> {
        let mut merged = serde_json::to_value(self)
            .map_err(|e| AnalysisError::invalid_config(e.to_string()))?;
        merge_json(&mut merged, overrides);
        let config: AnalyzerConfig = serde_json::from_value(merged)
            .map_err(|e| AnalysisError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}
