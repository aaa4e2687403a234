//! 动作评分
//!
//! 每个合格帧计算四项分数（深度、背部姿态、膝关节对齐、动作控制），范围都是 [0, 100]。
//! 一次深蹲内逐帧累加，计数时取平均得到该次的分数；会话分数是各次分数的平均。
//! 总分按权重加权。

use serde::Serialize;

use crate::analysis::config::{ScoreWeights, ScoringConfig};
use crate::analysis::gate::KneeAlignment;

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// 膝角越小越深；`depth_full_angle` 及以下满分，`depth_zero_angle` 及以上为 0
pub fn depth_score(knee_angle: f64, config: &ScoringConfig) -> f64 {
    let span = config.depth_zero_angle - config.depth_full_angle;
    clamp_score(100.0 - (knee_angle - config.depth_full_angle) / span * 100.0)
}

pub fn back_score(torso_lean: f64, config: &ScoringConfig) -> f64 {
    let score = if torso_lean < config.back_ideal_min {
        100.0 - (config.back_ideal_min - torso_lean) * config.back_under_penalty
    } else if torso_lean > config.back_ideal_max {
        100.0 - (torso_lean - config.back_ideal_max) * config.back_over_penalty
    } else {
        100.0
    };
    clamp_score(score)
}

pub fn knee_alignment_score(alignment: &KneeAlignment, config: &ScoringConfig) -> f64 {
    let mut score = 100.0;
    if alignment.knee_overshoot {
        score -= config.knee_overshoot_penalty;
    }
    if alignment.valgus {
        score -= config.valgus_penalty;
    }
    clamp_score(score)
}

/// `velocity` 为平均速度（度/帧）。超过 good 线后按比例扣分，超过 bad 线后扣得更快
pub fn control_score(velocity: f64, config: &ScoringConfig) -> f64 {
    let moderate =
        (velocity.min(config.control_bad_velocity) - config.control_good_velocity).max(0.0);
    let excessive = (velocity - config.control_bad_velocity).max(0.0);
    clamp_score(
        100.0 - moderate * config.control_good_penalty - excessive * config.control_bad_penalty,
    )
}

/// 四项分数（浮点，未取整）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScores {
    pub depth: f64,
    pub back_posture: f64,
    pub knee_alignment: f64,
    pub control: f64,
}

impl ComponentScores {
    /// 单帧打分
    pub fn for_frame(
        knee_angle: f64,
        torso_lean: f64,
        alignment: &KneeAlignment,
        velocity: f64,
        config: &ScoringConfig,
    ) -> Self {
        Self {
            depth: depth_score(knee_angle, config),
            back_posture: back_score(torso_lean, config),
            knee_alignment: knee_alignment_score(alignment, config),
            control: control_score(velocity, config),
        }
    }

    pub fn overall(&self, weights: &ScoreWeights) -> f64 {
        clamp_score(
            self.depth * weights.depth
                + self.back_posture * weights.back_posture
                + self.knee_alignment * weights.knee_alignment
                + self.control * weights.control,
        )
    }

    fn accumulate(&mut self, other: &ComponentScores) {
        self.depth += other.depth;
        self.back_posture += other.back_posture;
        self.knee_alignment += other.knee_alignment;
        self.control += other.control;
    }

    fn divided_by(&self, n: f64) -> Self {
        Self {
            depth: self.depth / n,
            back_posture: self.back_posture / n,
            knee_alignment: self.knee_alignment / n,
            control: self.control / n,
        }
    }
}

/// 对外报告的会话分数，四舍五入为整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScores {
    pub depth: u8,
    pub back_posture: u8,
    pub knee_alignment: u8,
    pub control: u8,
    pub overall: u8,
}

fn round_score(score: f64) -> u8 {
    clamp_score(score).round() as u8
}

impl SessionScores {
    pub fn from_components(components: &ComponentScores, weights: &ScoreWeights) -> Self {
        Self {
            depth: round_score(components.depth),
            back_posture: round_score(components.back_posture),
            knee_alignment: round_score(components.knee_alignment),
            control: round_score(components.control),
            overall: round_score(components.overall(weights)),
        }
    }
}

/// 一次已计数的深蹲
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepSummary {
    /// 从 1 开始
    pub index: u32,
    pub scores: ComponentScores,
    pub overall: f64,
    pub frame_count: u32,
    pub lowest_knee_angle: f64,
    pub started_at: f64,
    pub ended_at: f64,
}

#[derive(Debug, Clone)]
struct RepTotals {
    totals: ComponentScores,
    frames: u32,
    started_at: f64,
    last_at: f64,
}

#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    weights: ScoreWeights,
    current: Option<RepTotals>,
    reps: Vec<RepSummary>,
}

impl ScoreAccumulator {
    pub fn new(weights: &ScoreWeights) -> Self {
        Self {
            weights: weights.clone(),
            current: None,
            reps: Vec::new(),
        }
    }

    /// 开始新的一次深蹲，丢弃任何未结算的累计
    pub fn begin_rep(&mut self, timestamp: f64) {
        self.current = Some(RepTotals {
            totals: ComponentScores::default(),
            frames: 0,
            started_at: timestamp,
            last_at: timestamp,
        });
    }

    pub fn add_frame(&mut self, scores: &ComponentScores, timestamp: f64) {
        if let Some(rep) = self.current.as_mut() {
            rep.totals.accumulate(scores);
            rep.frames += 1;
            rep.last_at = timestamp;
        }
    }

    pub fn discard_rep(&mut self) {
        self.current = None;
    }

    /// 结算当前这次深蹲；没有任何帧时返回 None
    pub fn commit_rep(&mut self, lowest_knee_angle: f64, ended_at: f64) -> Option<&RepSummary> {
        let rep = self.current.take()?;
        if rep.frames == 0 {
            return None;
        }

        let scores = rep.totals.divided_by(f64::from(rep.frames));
        self.reps.push(RepSummary {
            index: self.reps.len() as u32 + 1,
            overall: scores.overall(&self.weights),
            scores,
            frame_count: rep.frames,
            lowest_knee_angle,
            started_at: rep.started_at,
            ended_at: ended_at.max(rep.last_at),
        });
        self.reps.last()
    }

    pub fn in_rep_frames(&self) -> u32 {
        self.current.as_ref().map_or(0, |rep| rep.frames)
    }

    pub fn reps(&self) -> &[RepSummary] {
        &self.reps
    }

    /// 各次分数的平均；尚无计数时为 None
    pub fn session_components(&self) -> Option<ComponentScores> {
        if self.reps.is_empty() {
            return None;
        }
        let mut totals = ComponentScores::default();
        for rep in &self.reps {
            totals.accumulate(&rep.scores);
        }
        Some(totals.divided_by(self.reps.len() as f64))
    }

    pub fn session_scores(&self) -> Option<SessionScores> {
        self.session_components()
            .map(|components| SessionScores::from_components(&components, &self.weights))
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.reps.clear();
    }
}
