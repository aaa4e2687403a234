//! 分析核心的错误类型
//!
//! 逐帧的跳过（关键点缺失、质量门拒绝等）属于正常分类结果，不在这里表达，
//! 见 `session::SkipReason`。这里只有会话级别的失败。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid analyzer config: {0}")]
    InvalidConfig(String),
    #[error("insufficient data: {qualifying_frames} qualifying frames (need {required})")]
    InsufficientData {
        qualifying_frames: u64,
        required: u64,
    },
    #[error("no valid squat repetition detected")]
    NoRepetitions,
}

impl AnalysisError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// 对调用方而言都表示“没有检测到有效深蹲”
    pub fn is_no_squat(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::NoRepetitions)
    }
}
