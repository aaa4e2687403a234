//! 评分到文字反馈的映射
//!
//! 纯函数：相同的分数总是得到相同的文案。

use serde::Serialize;

use crate::analysis::scoring::{RepSummary, SessionScores};

/// 未检测到有效深蹲时给用户的提示
pub const NO_SQUAT_MESSAGE: &str =
    "No squat was detected. Check that your whole body is visible from the side and try again.";

const CLOSING_LINE: &str = "Keep practicing and it will keep getting better!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub headline: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Depth,
    BackPosture,
    KneeAlignment,
    Control,
}

/// 按总分分档的标题
pub fn headline(overall: u8) -> &'static str {
    match overall {
        90.. => "Near-perfect squat! Your form could go in a textbook.",
        80..=89 => "Great job! Your stance is solid and stable. Ready to push for more?",
        70..=79 => "Nice! Your fundamentals are strong. A little more depth and it's perfect.",
        50..=69 => "You're doing well! Stay consistent and you'll improve fast.",
        30..=49 => "Full marks for enthusiasm! Let's build the form together.",
        _ => "Did you almost sit down there? Every journey starts small.",
    }
}

pub fn component_detail(component: Component, score: u8) -> &'static str {
    match (component, score) {
        (Component::Depth, 0..=59) => {
            "Depth: sit lower until your thighs are close to parallel with the floor."
        }
        (Component::Depth, 60..=79) => "Depth: good range, a few more degrees would make it ideal.",
        (Component::Depth, _) => "Depth: excellent, you are reaching full depth.",
        (Component::BackPosture, 0..=59) => {
            "Back: keep your chest up and avoid folding forward or staying too upright."
        }
        (Component::BackPosture, 60..=79) => {
            "Back: mostly steady, watch your torso angle at the bottom."
        }
        (Component::BackPosture, _) => "Back: great torso angle throughout the movement.",
        (Component::KneeAlignment, 0..=59) => {
            "Knees: keep your knees tracking over your toes and don't let them cave in."
        }
        (Component::KneeAlignment, 60..=79) => {
            "Knees: alignment is decent, push your knees slightly outward."
        }
        (Component::KneeAlignment, _) => "Knees: well aligned over your feet.",
        (Component::Control, 0..=59) => {
            "Tempo: slow down and control both the descent and the rise."
        }
        (Component::Control, 60..=79) => "Tempo: fairly controlled, try a steadier descent.",
        (Component::Control, _) => "Tempo: smooth and controlled movement.",
    }
}

pub fn synthesize(scores: &SessionScores) -> Feedback {
    let details = [
        (Component::Depth, scores.depth),
        (Component::BackPosture, scores.back_posture),
        (Component::KneeAlignment, scores.knee_alignment),
        (Component::Control, scores.control),
    ]
    .into_iter()
    .map(|(component, score)| component_detail(component, score).to_string())
    .collect();

    Feedback {
        headline: headline(scores.overall).to_string(),
        details,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepHighlight {
    pub index: u32,
    pub overall: u8,
}

impl RepHighlight {
    fn of(rep: &RepSummary) -> Self {
        Self {
            index: rep.index,
            overall: rep.overall.clamp(0.0, 100.0).round() as u8,
        }
    }
}

/// 最好与最差的一次，以及逐次对比得出的教练提示
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepHighlights {
    pub best: RepHighlight,
    pub worst: RepHighlight,
    pub coaching: Vec<String>,
}

/// 按总分挑出最好和最差的一次；分数相同时取较早的一次
pub fn rep_highlights(reps: &[RepSummary]) -> Option<RepHighlights> {
    let first = reps.first()?;
    let (best, worst) = reps.iter().fold((first, first), |(best, worst), rep| {
        (
            if rep.overall > best.overall { rep } else { best },
            if rep.overall < worst.overall { rep } else { worst },
        )
    });

    let mut coaching = vec![format!(
        "Across {} reps your best scored {} and your weakest scored {}.",
        reps.len(),
        RepHighlight::of(best).overall,
        RepHighlight::of(worst).overall
    )];
    if best.scores.depth > 90.0 {
        coaching.push("Your depth and back angle were excellent on your best rep!".to_string());
    }
    if worst.scores.depth < 60.0 {
        coaching.push("Try sitting a little deeper on every rep.".to_string());
    }
    if worst.scores.back_posture < 60.0 {
        coaching.push("Pay attention to your back angle.".to_string());
    }
    coaching.push(CLOSING_LINE.to_string());

    Some(RepHighlights {
        best: RepHighlight::of(best),
        worst: RepHighlight::of(worst),
        coaching,
    })
}

/// 用于分享的简短文字
pub fn share_message(overall: u8, headline: &str) -> String {
    format!("My squat analysis: {overall}/100\n{headline}\nAnalyze your own squat form with Squat Coach!")
}
