use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use super::landmark::{Landmark, LandmarkId, Pose};
use crate::error::AnalysisError;

/// 1 フレーム分のランドマーク
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub pose: Pose,
}

impl Frame {
    pub fn new(index: usize, pose: Pose) -> Self {
        Self { index, pose }
    }
}

/// 1 回のスイング試技のフレーム列
///
/// フレーム番号は狭義単調増加、フレームレートは生成時に固定
#[derive(Debug, Clone)]
pub struct PoseSequence {
    frames: Vec<Frame>,
    fps: f32,
    span: usize,
}

impl PoseSequence {
    pub fn new(frames: Vec<Frame>, fps: f32) -> Result<Self, AnalysisError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(AnalysisError::InvalidSequence(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        if frames.is_empty() {
            return Err(AnalysisError::InvalidSequence("no frames".to_string()));
        }
        if let Some(pair) = frames.windows(2).find(|w| w[1].index <= w[0].index) {
            return Err(AnalysisError::InvalidSequence(format!(
                "frame index {} does not follow {}",
                pair[1].index, pair[0].index
            )));
        }
        let first = frames[0].index;
        let last = frames[frames.len() - 1].index;
        let span = last
            .checked_sub(first)
            .and_then(|d| d.checked_add(1))
            .ok_or_else(|| {
                AnalysisError::InvalidSequence(format!("frame range {}..={} is too large", first, last))
            })?;
        Ok(Self { frames, fps, span })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_index(&self) -> usize {
        self.frames[0].index
    }

    pub fn last_index(&self) -> usize {
        self.frames[self.frames.len() - 1].index
    }

    /// 先頭から末尾までのフレーム数（欠番を含む）
    pub fn span(&self) -> usize {
        self.span
    }

    /// 欠番を補間だけで埋めたときに到達できる最大フレーム数
    ///
    /// 隣り合うフレーム間の欠番が `max_gap` 以下なら全て埋まる、として数える
    pub fn best_case_retained(&self, max_gap: usize) -> usize {
        let fillable: usize = self
            .frames
            .windows(2)
            .map(|w| w[1].index - w[0].index - 1)
            .filter(|&missing| missing <= max_gap)
            .sum();
        self.frames.len() + fillable
    }
}

/// 外部の姿勢推定が出力するフレームレコード
///
/// 33 点出力（踵・つま先・指など）の余分な名前は変換時に読み捨てる
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    pub index: usize,
    #[serde(default)]
    pub landmarks: BTreeMap<String, Landmark>,
}

/// JSON 入力のルート
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceRecord {
    pub fps: f32,
    pub frames: Vec<FrameRecord>,
}

impl From<FrameRecord> for Frame {
    fn from(record: FrameRecord) -> Self {
        let mut pose = Pose::default();
        for (name, landmark) in record.landmarks {
            match LandmarkId::from_name(&name) {
                Some(id) => pose.set(id, landmark),
                None => debug!("frame {}: unknown landmark '{}' ignored", record.index, name),
            }
        }
        Frame::new(record.index, pose)
    }
}

impl TryFrom<SequenceRecord> for PoseSequence {
    type Error = AnalysisError;

    fn try_from(record: SequenceRecord) -> Result<Self, Self::Error> {
        let frames = record.frames.into_iter().map(Frame::from).collect();
        PoseSequence::new(frames, record.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Frame {
        Frame::new(index, Pose::default())
    }

    #[test]
    fn test_rejects_non_increasing_index() {
        let result = PoseSequence::new(vec![frame(0), frame(2), frame(2)], 30.0);
        assert!(matches!(result, Err(AnalysisError::InvalidSequence(_))));
    }

    #[test]
    fn test_rejects_bad_fps() {
        assert!(PoseSequence::new(vec![frame(0)], 0.0).is_err());
        assert!(PoseSequence::new(vec![frame(0)], f32::NAN).is_err());
        assert!(PoseSequence::new(vec![], 30.0).is_err());
    }

    #[test]
    fn test_span_counts_missing_indices() {
        let seq = PoseSequence::new(vec![frame(3), frame(4), frame(8)], 60.0).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.span(), 6);
        assert_eq!(seq.fps(), 60.0);
    }

    #[test]
    fn test_rejects_overflowing_span() {
        let result = PoseSequence::new(vec![frame(0), frame(usize::MAX)], 30.0);
        assert!(matches!(result, Err(AnalysisError::InvalidSequence(_))));

        let seq = PoseSequence::new(vec![frame(1), frame(usize::MAX)], 30.0).unwrap();
        assert_eq!(seq.span(), usize::MAX);
    }

    #[test]
    fn test_best_case_retained() {
        let seq = PoseSequence::new(vec![frame(0), frame(3), frame(4), frame(20)], 30.0).unwrap();
        // 0→3 の 2 欠番は埋まり、4→20 の 15 欠番は埋まらない
        assert_eq!(seq.best_case_retained(3), 6);
        assert_eq!(seq.best_case_retained(1), 4);
    }

    #[test]
    fn test_sequence_record_from_json() {
        let json = r#"{
            "fps": 30.0,
            "frames": [
                {"index": 0, "landmarks": {"left_wrist": {"x": 0.4, "y": 0.6, "z": -0.1, "visibility": 0.9}}},
                {"index": 1, "landmarks": {"right_wrist": {"x": 0.5, "y": 0.6, "visibility": 0.8}}}
            ]
        }"#;
        let record: SequenceRecord = serde_json::from_str(json).unwrap();
        let seq = PoseSequence::try_from(record).unwrap();
        assert_eq!(seq.len(), 2);

        let first = &seq.frames()[0].pose;
        assert_eq!(first.get(LandmarkId::LeftWrist).visibility, 0.9);
        assert_eq!(first.get(LandmarkId::RightWrist).visibility, 0.0);
        assert_eq!(seq.frames()[1].pose.get(LandmarkId::RightWrist).z, 0.0);
    }

    #[test]
    fn test_unknown_landmark_names_ignored() {
        let json = r#"{
            "fps": 30.0,
            "frames": [
                {"index": 0, "landmarks": {
                    "left_heel": {"x": 0.4, "y": 0.9, "z": 0.0, "visibility": 0.9},
                    "right_pinky": {"x": 0.5, "y": 0.6, "z": 0.0, "visibility": 0.9},
                    "left_wrist": {"x": 0.4, "y": 0.6, "z": -0.1, "visibility": 0.9}
                }}
            ]
        }"#;
        let record: SequenceRecord = serde_json::from_str(json).unwrap();
        let seq = PoseSequence::try_from(record).unwrap();
        let pose = &seq.frames()[0].pose;
        assert_eq!(pose.get(LandmarkId::LeftWrist).visibility, 0.9);
        assert_eq!(pose.get(LandmarkId::LeftAnkle).visibility, 0.0);
    }
}
