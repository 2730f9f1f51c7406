//! スイングフォルトの測定
//!
//! 解析器は設定だけを持ち、正規化済みシーケンスとフェーズ分割結果を読むだけなので
//! 実行順序に依存しない。

pub mod over_the_top;
pub mod shoulder_rotation;

use std::collections::BTreeMap;

use nalgebra::{Vector2, Vector3};
use serde::Serialize;

use crate::classify::{DataQuality, Severity};
use crate::config::{Config, Handedness};
use crate::error::FaultError;
use crate::normalize::NormalizedPoseSequence;
use crate::phase::{SegmentationResult, SwingPhase};
use crate::pose::LandmarkId;

pub use over_the_top::OverTheTopAnalyzer;
pub use shoulder_rotation::ShoulderRotationAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    OverTheTop,
    ShoulderRotation,
}

impl FaultKind {
    /// 出力順
    pub const ALL: [FaultKind; 2] = [FaultKind::OverTheTop, FaultKind::ShoulderRotation];

    pub fn name(&self) -> &'static str {
        match self {
            FaultKind::OverTheTop => "over_the_top",
            FaultKind::ShoulderRotation => "shoulder_rotation",
        }
    }
}

/// 1 つのフォルトの測定結果（生成後は不変）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultMeasurement {
    pub fault: FaultKind,
    pub value_degrees: f32,
    pub severity: Severity,
    /// value_degrees − ツアー平均
    pub benchmark_delta: f32,
    pub data_quality: DataQuality,
    /// 補助指標（名前 → 値）
    pub details: BTreeMap<String, f32>,
}

/// 解析器ごとの成否
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultReport {
    pub fault: FaultKind,
    pub outcome: Result<FaultMeasurement, FaultError>,
}

impl FaultReport {
    pub fn measurement(&self) -> Option<&FaultMeasurement> {
        self.outcome.as_ref().ok()
    }
}

/// フォルト解析器（閉じた集合）
#[derive(Debug, Clone)]
pub enum FaultAnalyzer {
    OverTheTop(OverTheTopAnalyzer),
    ShoulderRotation(ShoulderRotationAnalyzer),
}

impl FaultAnalyzer {
    pub fn new(kind: FaultKind, config: &Config) -> Self {
        match kind {
            FaultKind::OverTheTop => FaultAnalyzer::OverTheTop(OverTheTopAnalyzer::from_config(config)),
            FaultKind::ShoulderRotation => {
                FaultAnalyzer::ShoulderRotation(ShoulderRotationAnalyzer::from_config(config))
            }
        }
    }

    /// 全解析器（FaultKind::ALL の順）
    pub fn all(config: &Config) -> Vec<Self> {
        FaultKind::ALL.iter().map(|&kind| Self::new(kind, config)).collect()
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            FaultAnalyzer::OverTheTop(_) => FaultKind::OverTheTop,
            FaultAnalyzer::ShoulderRotation(_) => FaultKind::ShoulderRotation,
        }
    }

    pub fn measure(
        &self,
        sequence: &NormalizedPoseSequence,
        segmentation: &SegmentationResult,
    ) -> Result<FaultMeasurement, FaultError> {
        match self {
            FaultAnalyzer::OverTheTop(a) => a.measure(sequence, segmentation),
            FaultAnalyzer::ShoulderRotation(a) => a.measure(sequence, segmentation),
        }
    }
}

/// 必須フェーズの単一フレーム
pub(crate) fn require_frame(segmentation: &SegmentationResult, phase: SwingPhase) -> Result<usize, FaultError> {
    segmentation
        .frame(phase)
        .ok_or(FaultError::SegmentationAmbiguity { phase })
}

/// 利き手から見た向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Orientation {
    handedness: Handedness,
}

impl Orientation {
    pub(crate) fn new(handedness: Handedness) -> Self {
        Self { handedness }
    }

    /// 後ろ側（ターゲットから遠い側）の手首
    pub(crate) fn trailing_wrist(&self) -> LandmarkId {
        match self.handedness {
            Handedness::Right => LandmarkId::RightWrist,
            Handedness::Left => LandmarkId::LeftWrist,
        }
    }

    pub(crate) fn trailing_shoulder(&self) -> LandmarkId {
        match self.handedness {
            Handedness::Right => LandmarkId::RightShoulder,
            Handedness::Left => LandmarkId::LeftShoulder,
        }
    }

    pub(crate) fn lead_shoulder(&self) -> LandmarkId {
        match self.handedness {
            Handedness::Right => LandmarkId::LeftShoulder,
            Handedness::Left => LandmarkId::RightShoulder,
        }
    }

    /// 水平面 (x, z) への射影 → (ターゲット方向成分, ボールライン方向成分)
    ///
    /// ボールライン方向はカメラ側（z が減る向き）を正とする。
    pub(crate) fn horizontal(&self, v: &Vector3<f32>) -> Vector2<f32> {
        let along = match self.handedness {
            Handedness::Right => v.x,
            Handedness::Left => -v.x,
        };
        Vector2::new(along, -v.z)
    }
}
