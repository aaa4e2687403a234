use serde_json::{json, Value};

pub const FRAME_INTERVAL_MS: f64 = 33.0;
const LANDMARK_COUNT: usize = 33;

const LEFT_SHOULDER: usize = 11;
const RIGHT_SHOULDER: usize = 12;
const LEFT_WRIST: usize = 15;
const RIGHT_WRIST: usize = 16;
const LEFT_HIP: usize = 23;
const RIGHT_HIP: usize = 24;
const LEFT_KNEE: usize = 25;
const RIGHT_KNEE: usize = 26;
const LEFT_ANKLE: usize = 27;
const RIGHT_ANKLE: usize = 28;

/// 侧面站姿小人：小腿竖直，膝角为 `knee_angle`，躯干前倾 30°
pub fn side_view_landmarks(knee_angle: f64) -> Value {
    let knee = (0.5, 0.7);
    let ankle = (0.5, 0.9);
    let theta = knee_angle.to_radians();
    let hip = (knee.0 - 0.2 * theta.sin(), knee.1 + 0.2 * theta.cos());
    let lean = 30.0_f64.to_radians();
    let shoulder = (hip.0 + 0.3 * lean.sin(), hip.1 - 0.3 * lean.cos());
    let wrist = (shoulder.0, shoulder.1 + 0.25);

    let mut points = vec![json!({"x": 0.5, "y": 0.1, "visibility": 0.2}); LANDMARK_COUNT];
    for (indices, (x, y)) in [
        ([LEFT_SHOULDER, RIGHT_SHOULDER], shoulder),
        ([LEFT_WRIST, RIGHT_WRIST], wrist),
        ([LEFT_HIP, RIGHT_HIP], hip),
        ([LEFT_KNEE, RIGHT_KNEE], knee),
        ([LEFT_ANKLE, RIGHT_ANKLE], ankle),
    ] {
        for index in indices {
            points[index] = json!({"x": x, "y": y, "visibility": 0.95});
        }
    }
    Value::Array(points)
}

/// 同一姿态但双手举过头顶
pub fn arms_raised_landmarks(knee_angle: f64) -> Value {
    let mut landmarks = side_view_landmarks(knee_angle);
    for index in [LEFT_WRIST, RIGHT_WRIST] {
        landmarks[index]["y"] = json!(0.02);
    }
    landmarks
}

/// 一次完整深蹲的膝角序列：站立、以 8°/帧下蹲、底部停留、起身、站立
pub fn rep_angles(bottom: f64) -> Vec<f64> {
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

pub fn frames_from_angles(angles: &[f64]) -> Vec<Value> {
    angles
        .iter()
        .enumerate()
        .map(|(i, &angle)| {
            json!({
                "timestamp": i as f64 * FRAME_INTERVAL_MS,
                "landmarks": side_view_landmarks(angle),
            })
        })
        .collect()
}

pub fn session_frames(bottoms: &[f64]) -> Vec<Value> {
    let angles: Vec<f64> = bottoms.iter().flat_map(|&b| rep_angles(b)).collect();
    frames_from_angles(&angles)
}

pub fn analysis_body(frames: Vec<Value>) -> Value {
    json!({ "frames": frames })
}
