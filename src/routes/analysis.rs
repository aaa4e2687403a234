use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalyzerConfig, LandmarkSet, SessionReport, SquatAnalyzer};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::validation::{
    validate_frame_count, validate_landmarks, validate_timestamp, FrameCountError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(analyze_session))
        .route("/config", get(default_config))
}

/// 检测器的一帧输出；`landmarks` 为 null 或缺省表示这一帧没有检测到人体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInput {
    pub timestamp: f64,
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub frames: Vec<FrameInput>,
    /// 合并到服务端默认配置上的部分覆盖
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analyzed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: SessionReport,
}

async fn analyze_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_request(&req, state.config().limits.max_frames_per_request)?;

    let config = match &req.config {
        Some(overrides) => state.analyzer_defaults().with_overrides(overrides)?,
        None => state.analyzer_defaults().clone(),
    };
    let frame_count = req.frames.len();

    // 分析是纯 CPU 计算，长视频放到阻塞线程池里跑
    let report = tokio::task::spawn_blocking(move || run_session(config, &req.frames))
        .await
        .map_err(|e| AppError::internal(&format!("analysis task failed: {e}")))??;

    tracing::info!(
        frames = frame_count,
        analyzed = report.stats.frames_analyzed,
        rep_count = report.rep_count,
        overall = report.scores.overall,
        "Squat analysis completed"
    );
    Ok(ok(AnalyzeResponse {
        analyzed_at: Utc::now(),
        report,
    }))
}

fn validate_request(req: &AnalyzeRequest, max_frames: usize) -> Result<(), AppError> {
    validate_frame_count(req.frames.len(), max_frames).map_err(|e| match e {
        FrameCountError::Empty => AppError::bad_request("INVALID_FRAMES", &e.to_string()),
        FrameCountError::TooMany { .. } => AppError::payload_too_large(&e.to_string()),
    })?;

    for (i, frame) in req.frames.iter().enumerate() {
        validate_timestamp(frame.timestamp)
            .map_err(|msg| AppError::bad_request("INVALID_FRAMES", &format!("frames[{i}]: {msg}")))?;
        if let Some(landmarks) = &frame.landmarks {
            validate_landmarks(landmarks).map_err(|msg| {
                AppError::bad_request("INVALID_FRAMES", &format!("frames[{i}]: {msg}"))
            })?;
        }
    }
    Ok(())
}

fn run_session(config: AnalyzerConfig, frames: &[FrameInput]) -> Result<SessionReport, AppError> {
    let mut analyzer = SquatAnalyzer::new(config)?;
    for frame in frames {
        analyzer.analyze(frame.landmarks.as_ref(), frame.timestamp);
    }
    let stats = analyzer.stats();
    tracing::debug!(
        received = stats.frames_received,
        analyzed = stats.frames_analyzed,
        skipped = stats.skipped.total(),
        "Frames processed"
    );
    Ok(analyzer.report()?)
}

async fn default_config(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.analyzer_defaults().clone())
}
