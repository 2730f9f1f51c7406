//! 正規化済みランドマークから動作信号を作る
//!
//! 信号はすべて正規化シーケンスのスロットと同じ並びで、欠損は None。

pub mod derivative;
pub mod smooth;

use nalgebra::Vector3;
use tracing::info;

use crate::config::SignalConfig;
use crate::normalize::NormalizedPoseSequence;
use crate::pose::{LandmarkId, Pose};

pub use derivative::{central_difference, unwrap_degrees};
pub use smooth::moving_average;

/// スロットごとの動作信号
#[derive(Debug, Clone, PartialEq)]
pub struct SwingSignals {
    /// スロット 0 のフレーム番号
    pub first_index: usize,
    pub fps: f32,
    /// 手首中点の速さ（肩幅/秒）
    pub wrist_speed: Vec<Option<f32>>,
    /// 右肩 → 左肩の画像面内角度（度、アンラップ済み）
    pub shoulder_angle: Vec<Option<f32>>,
    /// 右腰 → 左腰の画像面内角度（度、アンラップ済み）
    pub hip_angle: Vec<Option<f32>>,
    /// 肩ライン角度の変化率（度/秒）
    pub torso_rotation_rate: Vec<Option<f32>>,
}

impl SwingSignals {
    pub fn len(&self) -> usize {
        self.wrist_speed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrist_speed.is_empty()
    }

    pub fn index_of(&self, pos: usize) -> usize {
        self.first_index + pos
    }
}

/// 右 → 左ランドマークを結ぶ線の画像面内角度（度）
pub fn line_angle_deg(pose: &Pose, right: LandmarkId, left: LandmarkId, threshold: f32) -> Option<f32> {
    let v = pose.segment(right, left, threshold)?;
    if v.x == 0.0 && v.y == 0.0 {
        return None;
    }
    Some(f32::atan2(v.y, v.x).to_degrees())
}

pub struct SignalBuilder {
    smoothing_window: usize,
}

impl SignalBuilder {
    pub fn new(smoothing_window: usize) -> Self {
        Self { smoothing_window }
    }

    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(config.smoothing_window)
    }

    pub fn build(&self, sequence: &NormalizedPoseSequence) -> SwingSignals {
        let threshold = sequence.confidence_threshold();
        let fps = sequence.fps();
        let poses: Vec<Option<&Pose>> = sequence
            .slots()
            .iter()
            .map(|slot| slot.as_ref().map(|f| &f.pose))
            .collect();

        let wrist: Vec<Option<Vector3<f32>>> = poses
            .iter()
            .map(|p| p.and_then(|p| p.midpoint(LandmarkId::LeftWrist, LandmarkId::RightWrist, threshold)))
            .collect();
        let raw_speed: Vec<Option<f32>> = central_difference(&wrist, fps)
            .into_iter()
            .map(|v| v.map(|v| v.norm()))
            .collect();

        let angle = |right: LandmarkId, left: LandmarkId| -> Vec<Option<f32>> {
            let raw: Vec<Option<f32>> = poses
                .iter()
                .map(|p| p.and_then(|p| line_angle_deg(p, right, left, threshold)))
                .collect();
            unwrap_degrees(&raw)
        };
        let shoulder = angle(LandmarkId::RightShoulder, LandmarkId::LeftShoulder);
        let hip = angle(LandmarkId::RightHip, LandmarkId::LeftHip);
        let rotation_rate = central_difference(&shoulder, fps);

        let signals = SwingSignals {
            first_index: sequence.first_index(),
            fps,
            wrist_speed: moving_average(&raw_speed, self.smoothing_window),
            shoulder_angle: moving_average(&shoulder, self.smoothing_window),
            hip_angle: moving_average(&hip, self.smoothing_window),
            torso_rotation_rate: moving_average(&rotation_rate, self.smoothing_window),
        };

        let present = signals.wrist_speed.iter().flatten().count();
        info!(
            "signals built: {} slots, {} with wrist speed, window {}",
            signals.len(),
            present,
            self.smoothing_window
        );
        signals
    }
}
