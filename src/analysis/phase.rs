//! 深蹲阶段状态机
//!
//! 四个阶段：站立 → 下蹲 → 底部 → 起身 → 站立。进入与离开每个阶段使用不同的
//! 阈值（滞回），避免膝角在阈值附近抖动时来回切换。
//!
//! 只有经过质量门的帧才会送进状态机；一次深蹲在起身回到站立时结算，
//! 到达过底部且持续帧数足够才计数。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::config::PhaseConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepPhase {
    #[default]
    Standing,
    Descending,
    Bottom,
    Ascending,
}

impl RepPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RepPhase::Standing => "standing",
            RepPhase::Descending => "descending",
            RepPhase::Bottom => "bottom",
            RepPhase::Ascending => "ascending",
        }
    }
}

/// 单次 `step` 对一次深蹲生命周期的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    None,
    /// 从站立开始下蹲
    Started,
    /// 未到底部就站了回去
    Aborted,
    /// 回到站立；`counted` 为 false 表示深度或时长不足
    Completed { counted: bool },
}

#[derive(Debug, Clone)]
pub struct RepPhaseMachine {
    config: PhaseConfig,
    phase: RepPhase,
    rep_count: u32,
    frame_count_in_rep: u32,
    bottom_hold_frames: u32,
    best_knee_angle_in_rep: Option<f64>,
    rep_reached_min_depth: bool,
}

impl RepPhaseMachine {
    pub fn new(config: &PhaseConfig) -> Self {
        Self {
            config: config.clone(),
            phase: RepPhase::Standing,
            rep_count: 0,
            frame_count_in_rep: 0,
            bottom_hold_frames: 0,
            best_knee_angle_in_rep: None,
            rep_reached_min_depth: false,
        }
    }

    pub fn phase(&self) -> RepPhase {
        self.phase
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn frame_count_in_rep(&self) -> u32 {
        self.frame_count_in_rep
    }

    pub fn bottom_hold_frames(&self) -> u32 {
        self.bottom_hold_frames
    }

    /// 当前这次深蹲中最小的平滑膝角
    pub fn best_knee_angle_in_rep(&self) -> Option<f64> {
        self.best_knee_angle_in_rep
    }

    pub fn rep_reached_min_depth(&self) -> bool {
        self.rep_reached_min_depth
    }

    /// 推进一帧（平滑后的膝角）
    pub fn step(&mut self, knee_angle: f64) -> PhaseEvent {
        let cfg = &self.config;
        let mut event = PhaseEvent::None;

        match self.phase {
            RepPhase::Standing => {
                if knee_angle <= cfg.descend_angle {
                    self.clear_rep();
                    self.phase = RepPhase::Descending;
                    event = PhaseEvent::Started;
                    debug!(knee_angle, "squat phase: descending");
                }
            }
            RepPhase::Descending => {
                if knee_angle <= cfg.bottom_angle {
                    self.bottom_hold_frames += 1;
                    if self.bottom_hold_frames >= cfg.min_bottom_hold_frames {
                        self.phase = RepPhase::Bottom;
                        self.rep_reached_min_depth = true;
                        debug!(knee_angle, "squat phase: bottom");
                    }
                } else if knee_angle > cfg.stand_angle {
                    debug!(
                        knee_angle,
                        frames = self.frame_count_in_rep,
                        "squat phase: standing (descent aborted)"
                    );
                    self.phase = RepPhase::Standing;
                    self.clear_rep();
                    event = PhaseEvent::Aborted;
                } else {
                    // 底部保持必须连续
                    self.bottom_hold_frames = 0;
                }
            }
            RepPhase::Bottom => {
                if knee_angle > cfg.ascend_angle {
                    self.phase = RepPhase::Ascending;
                    self.bottom_hold_frames = 0;
                    debug!(knee_angle, "squat phase: ascending");
                }
            }
            RepPhase::Ascending => {
                if knee_angle > cfg.stand_angle {
                    let counted = self.rep_reached_min_depth
                        && self.frame_count_in_rep >= cfg.min_squat_duration_frames;
                    if counted {
                        self.rep_count += 1;
                    }
                    debug!(
                        knee_angle,
                        counted,
                        frames = self.frame_count_in_rep,
                        reached_depth = self.rep_reached_min_depth,
                        rep_count = self.rep_count,
                        "squat phase: standing (rep finished)"
                    );
                    self.phase = RepPhase::Standing;
                    self.clear_rep();
                    event = PhaseEvent::Completed { counted };
                }
            }
        }

        if self.phase != RepPhase::Standing {
            self.frame_count_in_rep += 1;
            self.best_knee_angle_in_rep = Some(
                self.best_knee_angle_in_rep
                    .map_or(knee_angle, |best| best.min(knee_angle)),
            );
        }

        event
    }

    fn clear_rep(&mut self) {
        self.frame_count_in_rep = 0;
        self.bottom_hold_frames = 0;
        self.best_knee_angle_in_rep = None;
        self.rep_reached_min_depth = false;
    }

    pub fn reset(&mut self) {
        self.clear_rep();
        self.phase = RepPhase::Standing;
        self.rep_count = 0;
    }
}
