//! 一次分析会话
//!
//! `SquatAnalyzer` 拥有会话的全部可变状态，逐帧调用 `analyze`，结束时调用 `report`。
//! 单帧处理流程：
//! 1. 时间戳必须严格递增
//! 2. 解析必需关键点，缺失则跳过
//! 3. 非深蹲姿态直接拒绝（不改变任何状态）
//! 4. 平滑膝角、估计速度
//! 5. 质量门多数表决，未通过则跳过
//! 6. 推进阶段状态机，并把分数累加到当前这次深蹲

use serde::Serialize;
use tracing::{debug, trace};

use crate::analysis::config::AnalyzerConfig;
use crate::analysis::error::AnalysisError;
use crate::analysis::feedback::{self, Feedback, RepHighlights};
use crate::analysis::gate::{assess_knee_alignment, MotionQualityGate, PostureRejection, QualityFlags};
use crate::analysis::landmarks::{BodyPoint, LandmarkSet};
use crate::analysis::phase::{PhaseEvent, RepPhase, RepPhaseMachine};
use crate::analysis::scoring::{ComponentScores, RepSummary, ScoreAccumulator, SessionScores};
use crate::analysis::smoother::SignalSmoother;

/// 帧被跳过的原因，跳过的帧不改变阶段与计分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "camelCase")]
pub enum SkipReason {
    /// 检测器没有给出人体
    NoPose,
    MissingLandmark(BodyPoint),
    /// 时间戳没有严格递增
    OutOfOrder,
    NonSquat(PostureRejection),
    QualityGate,
}

/// 一个被分析的帧
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    pub timestamp: f64,
    pub raw_knee_angle: f64,
    pub knee_angle: f64,
    pub average_velocity: f64,
    pub torso_lean: f64,
    pub phase: RepPhase,
    pub rep_count: u32,
    pub scores: ComponentScores,
    pub flags: QualityFlags,
    /// 本帧结算了一次计数的深蹲
    pub rep_completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Analyzed(FrameAnalysis),
    Skipped(SkipReason),
}

impl FrameOutcome {
    pub fn is_analyzed(&self) -> bool {
        matches!(self, FrameOutcome::Analyzed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounts {
    pub no_pose: u64,
    pub missing_landmark: u64,
    pub out_of_order: u64,
    pub non_squat: u64,
    pub quality_gate: u64,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::NoPose => &mut self.no_pose,
            SkipReason::MissingLandmark(_) => &mut self.missing_landmark,
            SkipReason::OutOfOrder => &mut self.out_of_order,
            SkipReason::NonSquat(_) => &mut self.non_squat,
            SkipReason::QualityGate => &mut self.quality_gate,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.no_pose + self.missing_landmark + self.out_of_order + self.non_squat + self.quality_gate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub frames_received: u64,
    /// 通过质量门的帧
    pub frames_analyzed: u64,
    pub skipped: SkipCounts,
}

/// 全程膝角最小（蹲得最深）的时刻
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMoment {
    pub timestamp: f64,
    pub knee_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub rep_count: u32,
    pub scores: SessionScores,
    pub feedback: Feedback,
    pub best_moment_timestamp: Option<f64>,
    pub best_knee_angle: Option<f64>,
    pub reps: Vec<RepSummary>,
    pub highlights: Option<RepHighlights>,
    pub share_message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Clone)]
pub struct SquatAnalyzer {
    config: AnalyzerConfig,
    smoother: SignalSmoother,
    gate: MotionQualityGate,
    phases: RepPhaseMachine,
    scores: ScoreAccumulator,
    last_timestamp: Option<f64>,
    quality_flags: Option<QualityFlags>,
    best_moment: Option<BestMoment>,
    stats: SessionStats,
}

impl SquatAnalyzer {
    /// 配置非法时立即失败
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            smoother: SignalSmoother::new(&config.smoothing),
            gate: MotionQualityGate::new(&config),
            phases: RepPhaseMachine::new(&config.phase),
            scores: ScoreAccumulator::new(&config.scoring.weights),
            last_timestamp: None,
            quality_flags: None,
            best_moment: None,
            stats: SessionStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn rep_count(&self) -> u32 {
        self.phases.rep_count()
    }

    pub fn phase(&self) -> RepPhase {
        self.phases.phase()
    }

    /// 最近一次质量门的结果
    pub fn quality_flags(&self) -> Option<QualityFlags> {
        self.quality_flags
    }

    pub fn best_moment(&self) -> Option<BestMoment> {
        self.best_moment
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn reps(&self) -> &[RepSummary] {
        self.scores.reps()
    }

    /// 处理一帧。`landmarks` 为 None 或空表示本帧没有检测到人体
    pub fn analyze(&mut self, landmarks: Option<&LandmarkSet>, timestamp: f64) -> FrameOutcome {
        self.stats.frames_received += 1;
        let outcome = self.process(landmarks, timestamp);
        match &outcome {
            FrameOutcome::Analyzed(_) => self.stats.frames_analyzed += 1,
            FrameOutcome::Skipped(reason) => {
                trace!(timestamp, reason = ?reason, "frame skipped");
                self.stats.skipped.record(*reason);
            }
        }
        outcome
    }

    fn process(&mut self, landmarks: Option<&LandmarkSet>, timestamp: f64) -> FrameOutcome {
        let in_order = timestamp.is_finite()
            && self.last_timestamp.map_or(true, |last| timestamp > last);
        if !in_order {
            return FrameOutcome::Skipped(SkipReason::OutOfOrder);
        }
        self.last_timestamp = Some(timestamp);

        let Some(landmarks) = landmarks.filter(|set| !set.is_empty()) else {
            return FrameOutcome::Skipped(SkipReason::NoPose);
        };
        let pose = match landmarks.resolve(self.config.gate.min_visibility) {
            Ok(pose) => pose,
            Err(point) => return FrameOutcome::Skipped(SkipReason::MissingLandmark(point)),
        };

        let raw_knee_angle = pose.knee_angle();
        if let Err(rejection) = self.gate.check_posture(&pose, raw_knee_angle) {
            return FrameOutcome::Skipped(SkipReason::NonSquat(rejection));
        }

        let knee_angle = self.smoother.smooth(raw_knee_angle);
        self.smoother.velocity(knee_angle);
        let average_velocity = self.smoother.average_velocity();

        if self.best_moment.map_or(true, |best| knee_angle < best.knee_angle) {
            self.best_moment = Some(BestMoment {
                timestamp,
                knee_angle,
            });
        }

        let alignment = assess_knee_alignment(&pose, &self.config.knee_alignment);
        let flags = self
            .gate
            .evaluate(&pose, knee_angle, average_velocity, &alignment);
        self.quality_flags = Some(flags);
        if !self.gate.passes(&flags) {
            trace!(timestamp, knee_angle, average_velocity, flags = ?flags, "quality gate failed");
            return FrameOutcome::Skipped(SkipReason::QualityGate);
        }

        let torso_lean = pose.torso_lean();
        let frame_scores = ComponentScores::for_frame(
            knee_angle,
            torso_lean,
            &alignment,
            average_velocity,
            &self.config.scoring,
        );

        let lowest_in_rep = self.phases.best_knee_angle_in_rep();
        let mut rep_completed = false;
        match self.phases.step(knee_angle) {
            PhaseEvent::None => {}
            PhaseEvent::Started => self.scores.begin_rep(timestamp),
            PhaseEvent::Aborted | PhaseEvent::Completed { counted: false } => {
                self.scores.discard_rep()
            }
            PhaseEvent::Completed { counted: true } => {
                if let Some(rep) = self
                    .scores
                    .commit_rep(lowest_in_rep.unwrap_or(knee_angle), timestamp)
                {
                    debug!(
                        rep = rep.index,
                        overall = rep.overall,
                        frames = rep.frame_count,
                        lowest_knee_angle = rep.lowest_knee_angle,
                        "rep counted"
                    );
                }
                rep_completed = true;
            }
        }

        let phase = self.phases.phase();
        if phase != RepPhase::Standing {
            self.scores.add_frame(&frame_scores, timestamp);
        }

        trace!(
            timestamp,
            raw_knee_angle,
            knee_angle,
            average_velocity,
            torso_lean,
            phase = phase.as_str(),
            "frame analyzed"
        );

        FrameOutcome::Analyzed(FrameAnalysis {
            timestamp,
            raw_knee_angle,
            knee_angle,
            average_velocity,
            torso_lean,
            phase,
            rep_count: self.phases.rep_count(),
            scores: frame_scores,
            flags,
            rep_completed,
        })
    }

    /// 会话总结
    ///
    /// 合格帧太少返回 `InsufficientData`，没有任何计数返回 `NoRepetitions`；
    /// 两者都表示"没有检测到有效深蹲"，调用方可以用 `feedback::NO_SQUAT_MESSAGE` 提示用户。
    pub fn report(&self) -> Result<SessionReport, AnalysisError> {
        let required = self.config.session.min_qualifying_frames;
        if self.stats.frames_analyzed < required {
            return Err(AnalysisError::InsufficientData {
                qualifying_frames: self.stats.frames_analyzed,
                required,
            });
        }

        let scores = self
            .scores
            .session_scores()
            .ok_or(AnalysisError::NoRepetitions)?;
        let feedback = feedback::synthesize(&scores);
        let share_message = feedback::share_message(scores.overall, &feedback.headline);

        Ok(SessionReport {
            rep_count: self.phases.rep_count(),
            scores,
            best_moment_timestamp: self.best_moment.map(|best| best.timestamp),
            best_knee_angle: self.best_moment.map(|best| best.knee_angle),
            reps: self.scores.reps().to_vec(),
            highlights: feedback::rep_highlights(self.scores.reps()),
            share_message,
            stats: self.stats,
            feedback,
        })
    }

    /// 清空会话状态，配置保持不变
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.phases.reset();
        self.scores.reset();
        self.last_timestamp = None;
        self.quality_flags = None;
        self.best_moment = None;
        self.stats = SessionStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::landmarks::Landmark;

    /// 侧面视角的站姿小人：小腿竖直，大腿与小腿夹角为 `knee_angle`，躯干前倾 30°
    fn side_view(knee_angle: f64) -> LandmarkSet {
        let knee = (0.5, 0.7);
        let ankle = (0.5, 0.9);
        let theta = knee_angle.to_radians();
        let hip = (knee.0 - 0.2 * theta.sin(), knee.1 + 0.2 * theta.cos());
        let lean = 30.0_f64.to_radians();
        let shoulder = (hip.0 + 0.3 * lean.sin(), hip.1 - 0.3 * lean.cos());
        let wrist = (shoulder.0, shoulder.1 + 0.25);

        let mut set = LandmarkSet::default();
        let mut put = |point, (x, y): (f64, f64)| set.set(point, Landmark::new(x, y, 0.95));
        put(BodyPoint::LeftShoulder, shoulder);
        put(BodyPoint::RightShoulder, shoulder);
        put(BodyPoint::LeftWrist, wrist);
        put(BodyPoint::RightWrist, wrist);
        put(BodyPoint::LeftHip, hip);
        put(BodyPoint::RightHip, hip);
        put(BodyPoint::LeftKnee, knee);
        put(BodyPoint::RightKnee, knee);
        put(BodyPoint::LeftAnkle, ankle);
        put(BodyPoint::RightAnkle, ankle);
        set
    }

    fn rep_angles(bottom: f64) -> Vec<f64> {
        let mut angles = vec![170.0; 3];
        let mut angle = 162.0;
        while angle > bottom {
            angles.push(angle);
            angle -= 8.0;
        }
        angles.extend([bottom; 4]);
        let mut angle = bottom + 8.0;
        while angle < 170.0 {
            angles.push(angle);
            angle += 8.0;
        }
        angles.extend([170.0; 4]);
        angles
    }

    struct Feeder {
        analyzer: SquatAnalyzer,
        timestamp: f64,
    }

    impl Feeder {
        fn new() -> Self {
            Self {
                analyzer: SquatAnalyzer::new(AnalyzerConfig::default()).expect("default config"),
                timestamp: 0.0,
            }
        }

        fn feed(&mut self, angles: &[f64]) -> Vec<FrameOutcome> {
            angles
                .iter()
                .map(|&angle| {
                    self.timestamp += 33.0;
                    self.analyzer.analyze(Some(&side_view(angle)), self.timestamp)
                })
                .collect()
        }
    }

    #[test]
    fn side_view_fixture_has_requested_angle() {
        let pose = side_view(95.0).resolve(0.5).expect("complete pose");
        assert!((pose.knee_angle() - 95.0).abs() < 1e-6);
        assert!((pose.torso_lean() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_config_fails_fast() {
        let mut config = AnalyzerConfig::default();
        config.phase.bottom_angle = 155.0;
        assert!(matches!(
            SquatAnalyzer::new(config),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn clean_rep_counts_once() {
        let mut f = Feeder::new();
        let outcomes = f.feed(&rep_angles(90.0));
        assert!(outcomes.iter().all(FrameOutcome::is_analyzed));
        assert_eq!(f.analyzer.rep_count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, FrameOutcome::Analyzed(a) if a.rep_completed))
                .count(),
            1
        );

        f.feed(&[170.0; 10]);
        assert_eq!(f.analyzer.rep_count(), 1);
    }

    #[test]
    fn three_reps_are_ordered_by_depth() {
        let mut f = Feeder::new();
        for bottom in [70.0, 90.0, 110.0] {
            f.feed(&rep_angles(bottom));
        }

        let report = f.analyzer.report().expect("three reps");
        assert_eq!(report.rep_count, 3);
        assert_eq!(report.reps.len(), 3);
        let depths: Vec<f64> = report.reps.iter().map(|r| r.scores.depth).collect();
        assert!(depths[0] > depths[1], "{depths:?}");
        assert!(depths[1] > depths[2], "{depths:?}");
        assert!(report.reps[0].lowest_knee_angle < report.reps[2].lowest_knee_angle);

        // 最深的时刻在第一次深蹲里
        let best = report.best_moment_timestamp.expect("best moment");
        assert!(best >= report.reps[0].started_at && best <= report.reps[0].ended_at);
        assert!((report.best_knee_angle.expect("angle") - 70.0).abs() < 1e-6);

        let highlights = report.highlights.expect("highlights");
        assert_eq!(highlights.best.index, 1);
        assert_eq!(highlights.worst.index, 3);
        assert!(report.share_message.contains(&report.feedback.headline));
        assert_eq!(report.stats.frames_received, report.stats.frames_analyzed);
    }

    #[test]
    fn scores_stay_in_range() {
        let mut f = Feeder::new();
        for outcome in f.feed(&rep_angles(60.0)) {
            if let FrameOutcome::Analyzed(a) = outcome {
                for s in [a.scores.depth, a.scores.back_posture, a.scores.knee_alignment, a.scores.control] {
                    assert!((0.0..=100.0).contains(&s));
                }
            }
        }
        let scores = f.analyzer.report().expect("one rep").scores;
        assert!(scores.overall <= 100);
    }

    #[test]
    fn raised_arms_mid_rep_do_not_lose_progress() {
        let mut f = Feeder::new();
        let angles = rep_angles(90.0);
        let (first, rest) = angles.split_at(10);
        f.feed(first);
        let phase_before = f.analyzer.phase();
        assert_ne!(phase_before, RepPhase::Standing);

        let mut dancing = side_view(100.0);
        dancing.set(BodyPoint::LeftWrist, Landmark::new(0.5, 0.05, 0.95));
        f.timestamp += 33.0;
        let outcome = f.analyzer.analyze(Some(&dancing), f.timestamp);
        assert_eq!(
            outcome,
            FrameOutcome::Skipped(SkipReason::NonSquat(PostureRejection::WristAboveShoulder))
        );
        assert_eq!(f.analyzer.phase(), phase_before);

        f.feed(rest);
        assert_eq!(f.analyzer.rep_count(), 1);
        assert_eq!(f.analyzer.stats().skipped.non_squat, 1);
    }

    #[test]
    fn failed_quality_gate_mid_rep_keeps_progress() {
        let mut f = Feeder::new();
        let angles = rep_angles(90.0);
        let (first, rest) = angles.split_at(7);
        f.feed(first);
        assert_eq!(f.analyzer.phase(), RepPhase::Descending);
        assert_eq!(f.analyzer.phases.frame_count_in_rep(), 1);
        assert_eq!(f.analyzer.scores.in_rep_frames(), 1);

        // 膝角还没到底部，两膝又明显不等高：只有速度一项通过
        let mut lopsided = side_view(130.0);
        lopsided.set(BodyPoint::RightKnee, Landmark::new(0.5, 0.8, 0.95));
        f.timestamp += 33.0;
        assert_eq!(
            f.analyzer.analyze(Some(&lopsided), f.timestamp),
            FrameOutcome::Skipped(SkipReason::QualityGate)
        );
        let flags = f.analyzer.quality_flags().expect("flags recorded");
        assert!(!flags.has_proper_depth);
        assert!(!flags.has_symmetric_movement);
        assert_eq!(f.analyzer.phase(), RepPhase::Descending);
        assert_eq!(f.analyzer.phases.frame_count_in_rep(), 1);
        assert_eq!(f.analyzer.scores.in_rep_frames(), 1);

        f.feed(rest);
        assert_eq!(f.analyzer.rep_count(), 1);
        assert_eq!(f.analyzer.stats().skipped.quality_gate, 1);
        assert_eq!(f.analyzer.stats().skipped.total(), 1);
    }

    /// 7 帧下蹲、1 帧底部、7 帧起身，共 15 帧
    fn fifteen_frame_rep(bottom: f64) -> Vec<f64> {
        let step = (170.0 - bottom) / 7.0;
        let mut angles: Vec<f64> = (1..=7).map(|i| 170.0 - step * i as f64).collect();
        angles.push(bottom);
        angles.extend((1..=7).map(|i| bottom + step * i as f64));
        angles
    }

    #[test]
    fn fifteen_frame_reps_rank_by_depth() {
        let mut f = Feeder::new();
        f.feed(&[170.0; 3]);
        for bottom in [70.0, 90.0, 110.0] {
            let rep = fifteen_frame_rep(bottom);
            assert_eq!(rep.len(), 15);
            f.feed(&rep);
        }
        f.feed(&[170.0; 3]);

        let report = f.analyzer.report().expect("three reps");
        assert_eq!(report.rep_count, 3);
        assert_eq!(report.stats.skipped.total(), 0);
        let depths: Vec<f64> = report.reps.iter().map(|r| r.scores.depth).collect();
        assert!(depths[0] > depths[1] && depths[1] > depths[2], "{depths:?}");
    }

    #[test]
    fn missing_pose_and_landmarks_are_skipped() {
        let mut f = Feeder::new();
        assert_eq!(
            f.analyzer.analyze(None, 1.0),
            FrameOutcome::Skipped(SkipReason::NoPose)
        );
        assert_eq!(
            f.analyzer.analyze(Some(&LandmarkSet::default()), 2.0),
            FrameOutcome::Skipped(SkipReason::NoPose)
        );

        let mut partial = side_view(170.0);
        partial.set(BodyPoint::RightKnee, Landmark::new(0.5, 0.7, 0.1));
        assert_eq!(
            f.analyzer.analyze(Some(&partial), 3.0),
            FrameOutcome::Skipped(SkipReason::MissingLandmark(BodyPoint::RightKnee))
        );

        let stats = f.analyzer.stats();
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.frames_analyzed, 0);
        assert_eq!(stats.skipped.no_pose, 2);
        assert_eq!(stats.skipped.missing_landmark, 1);
        assert!(f.analyzer.quality_flags().is_none());
    }

    #[test]
    fn stale_timestamps_are_skipped() {
        let mut f = Feeder::new();
        let pose = side_view(170.0);
        assert!(f.analyzer.analyze(Some(&pose), 100.0).is_analyzed());
        assert_eq!(
            f.analyzer.analyze(Some(&pose), 100.0),
            FrameOutcome::Skipped(SkipReason::OutOfOrder)
        );
        assert_eq!(
            f.analyzer.analyze(Some(&pose), 50.0),
            FrameOutcome::Skipped(SkipReason::OutOfOrder)
        );
        assert_eq!(
            f.analyzer.analyze(Some(&pose), f64::NAN),
            FrameOutcome::Skipped(SkipReason::OutOfOrder)
        );
        assert!(f.analyzer.analyze(Some(&pose), 133.0).is_analyzed());
    }

    #[test]
    fn too_few_frames_is_insufficient_data() {
        let mut f = Feeder::new();
        f.feed(&[170.0; 5]);
        assert_eq!(
            f.analyzer.report(),
            Err(AnalysisError::InsufficientData {
                qualifying_frames: 5,
                required: 10
            })
        );
    }

    #[test]
    fn standing_only_has_no_repetitions() {
        let mut f = Feeder::new();
        f.feed(&[170.0; 30]);
        assert_eq!(f.analyzer.report(), Err(AnalysisError::NoRepetitions));
        assert!(f.analyzer.report().unwrap_err().is_no_squat());
    }

    #[test]
    fn reset_clears_the_session() {
        let mut f = Feeder::new();
        f.feed(&rep_angles(80.0));
        f.feed(&[150.0, 140.0]);
        f.analyzer.reset();

        assert_eq!(f.analyzer.rep_count(), 0);
        assert_eq!(f.analyzer.phase(), RepPhase::Standing);
        assert!(f.analyzer.reps().is_empty());
        assert!(f.analyzer.best_moment().is_none());
        assert!(f.analyzer.quality_flags().is_none());
        assert_eq!(*f.analyzer.stats(), SessionStats::default());

        // 时间戳可以从头开始
        assert!(f.analyzer.analyze(Some(&side_view(170.0)), 1.0).is_analyzed());
    }
}
