/// 分析请求的输入校验
/// 逐帧的语义问题（缺关键点、时间戳倒序）交给分析器按跳过处理，这里只拒绝结构上无效的数据。
use crate::analysis::landmarks::{LandmarkSet, POSE_LANDMARK_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameCountError {
    #[error("frames must not be empty")]
    Empty,
    #[error("at most {max} frames per request")]
    TooMany { max: usize },
}

/// 帧数：至少 1 帧，最多 `max` 帧
pub fn validate_frame_count(count: usize, max: usize) -> Result<(), FrameCountError> {
    if count == 0 {
        return Err(FrameCountError::Empty);
    }
    if count > max {
        return Err(FrameCountError::TooMany { max });
    }
    Ok(())
}

/// 时间戳（毫秒）必须是有限的非负数
pub fn validate_timestamp(timestamp: f64) -> Result<(), &'static str> {
    if !timestamp.is_finite() {
        return Err("timestamp must be a finite number");
    }
    if timestamp < 0.0 {
        return Err("timestamp must not be negative");
    }
    Ok(())
}

/// 关键点数量不超过 MediaPipe 布局，坐标有限，可见度在 [0, 1]
pub fn validate_landmarks(landmarks: &LandmarkSet) -> Result<(), &'static str> {
    if landmarks.len() > POSE_LANDMARK_COUNT {
        return Err("a frame carries at most 33 landmarks");
    }
    for landmark in landmarks.iter() {
        if !landmark.x.is_finite() || !landmark.y.is_finite() {
            return Err("landmark coordinates must be finite numbers");
        }
        if !(0.0..=1.0).contains(&landmark.visibility) {
            return Err("landmark visibility must be between 0 and 1");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::landmarks::Landmark;

    #[test]
    fn empty_frames_rejected() {
        assert_eq!(validate_frame_count(0, 100), Err(FrameCountError::Empty));
    }

    #[test]
    fn frame_limit_is_inclusive() {
        assert!(validate_frame_count(100, 100).is_ok());
        let err = validate_frame_count(101, 100).unwrap_err();
        assert_eq!(err, FrameCountError::TooMany { max: 100 });
        assert_eq!(err.to_string(), "at most 100 frames per request");
    }

    #[test]
    fn negative_or_nan_timestamp_rejected() {
        assert!(validate_timestamp(-1.0).is_err());
        assert!(validate_timestamp(f64::NAN).is_err());
        assert!(validate_timestamp(f64::INFINITY).is_err());
        assert!(validate_timestamp(0.0).is_ok());
    }

    #[test]
    fn full_pose_accepted() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.9); POSE_LANDMARK_COUNT]);
        assert!(validate_landmarks(&set).is_ok());
    }

    #[test]
    fn empty_pose_accepted() {
        assert!(validate_landmarks(&LandmarkSet::default()).is_ok());
    }

    #[test]
    fn oversized_pose_rejected() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.9); POSE_LANDMARK_COUNT + 1]);
        assert!(validate_landmarks(&set).is_err());
    }

    #[test]
    fn out_of_range_visibility_rejected() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 1.5)]);
        assert_eq!(
            validate_landmarks(&set),
            Err("landmark visibility must be between 0 and 1")
        );
    }

    #[test]
    fn non_finite_coordinates_rejected() {
        let set = LandmarkSet::new(vec![Landmark::new(f64::NAN, 0.5, 0.9)]);
        assert!(validate_landmarks(&set).is_err());
    }
}
