use serde::Serialize;

use crate::phase::SwingPhase;
use crate::pose::LandmarkId;

/// 試技単位で致命的なエラー（部分結果なし）
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid pose sequence: {0}")]
    InvalidSequence(String),

    #[error("insufficient data: {retained} of {expected} frames usable")]
    InsufficientData { retained: usize, expected: usize },

    #[error("reference shoulder width is degenerate at frame {frame}")]
    DegenerateScale { frame: usize },
}

/// 解析器単位のエラー。他の解析器の結果には影響しない
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultError {
    #[error("segmentation did not resolve the {phase:?} phase")]
    SegmentationAmbiguity { phase: SwingPhase },

    #[error("landmark {landmark:?} missing at frame {frame}")]
    MissingLandmark { landmark: LandmarkId, frame: usize },

    #[error("no hand motion toward the target in the measurement window")]
    InsufficientMotion,

    #[error("landmark {landmark:?} has no depth variation in the measurement window")]
    MissingDepth { landmark: LandmarkId },
}

/// 信頼度不足で除外されたフレーム（局所的に回復済み）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LowConfidenceFrame {
    pub frame: usize,
    pub landmark: LandmarkId,
    pub visibility: f32,
}
