//! 深蹲动作分析核心
//!
//! 同步、无 I/O：调用方逐帧送入关键点，会话结束时取报告。

pub mod angle;
pub mod config;
pub mod error;
pub mod feedback;
pub mod gate;
pub mod landmarks;
pub mod phase;
pub mod scoring;
pub mod session;
pub mod smoother;

pub use config::AnalyzerConfig;
pub use error::AnalysisError;
pub use landmarks::{BodyPoint, Landmark, LandmarkSet};
pub use session::{FrameOutcome, SessionReport, SkipReason, SquatAnalyzer};
