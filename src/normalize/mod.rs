//! ランドマーク正規化
//!
//! 信頼度の低いフレームを除外し、短い欠損を補間したうえで、
//! アドレス時の腰中点を原点・肩幅を単位とする座標系へ変換する。
//! 変換はシーケンスごとに一度だけ求め、全フレームに同じものを適用する。

pub mod gap;

use std::ops::Range;

use nalgebra::Vector3;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::NormalizeConfig;
use crate::error::{AnalysisError, LowConfidenceFrame};
use crate::pose::{Landmark, LandmarkId, Pose, PoseSequence};

/// 下流の解析が必ず使うランドマーク
pub const REQUIRED_LANDMARKS: [LandmarkId; 6] = [
    LandmarkId::LeftShoulder,
    LandmarkId::RightShoulder,
    LandmarkId::LeftHip,
    LandmarkId::RightHip,
    LandmarkId::LeftWrist,
    LandmarkId::RightWrist,
];

const MIN_REFERENCE_SCALE: f32 = 1e-4;

/// 保持フレームの集計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionStats {
    /// 先頭から末尾までのフレーム数
    pub expected: usize,
    /// 信頼度を満たした入力フレーム数
    pub observed: usize,
    /// 補間で埋めたフレーム数
    pub interpolated: usize,
    /// observed + interpolated
    pub retained: usize,
}

impl RetentionStats {
    pub fn ratio(&self) -> f32 {
        if self.expected == 0 {
            return 0.0;
        }
        self.retained as f32 / self.expected as f32
    }
}

/// 正規化の基準（アドレスフレームの腰中点と肩幅）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reference {
    pub frame: usize,
    pub origin: [f32; 3],
    pub scale: f32,
}

impl Reference {
    /// 画像座標 → 正規化座標（y は上向きを正）
    pub fn apply(&self, landmark: &Landmark) -> Landmark {
        Landmark {
            x: (landmark.x - self.origin[0]) / self.scale,
            y: (self.origin[1] - landmark.y) / self.scale,
            z: (landmark.z - self.origin[2]) / self.scale,
            visibility: landmark.visibility,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub index: usize,
    pub pose: Pose,
    pub interpolated: bool,
}

/// 正規化済みシーケンス（読み取り専用）
///
/// スロットは先頭フレーム番号から末尾まで欠番なく並び、除外フレームは None
#[derive(Debug, Clone)]
pub struct NormalizedPoseSequence {
    fps: f32,
    first_index: usize,
    slots: Vec<Option<NormalizedFrame>>,
    reference: Reference,
    stats: RetentionStats,
    low_confidence: Vec<LowConfidenceFrame>,
    confidence_threshold: f32,
}

impl NormalizedPoseSequence {
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn first_index(&self) -> usize {
        self.first_index
    }

    pub fn last_index(&self) -> usize {
        self.first_index + self.slots.len() - 1
    }

    /// スロット数（= 期待フレーム数）
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<NormalizedFrame>] {
        &self.slots
    }

    pub fn index_of(&self, pos: usize) -> usize {
        self.first_index + pos
    }

    pub fn position_of(&self, index: usize) -> Option<usize> {
        let pos = index.checked_sub(self.first_index)?;
        (pos < self.slots.len()).then_some(pos)
    }

    /// フレーム番号で取得（範囲外・除外フレームは None）
    pub fn frame(&self, index: usize) -> Option<&NormalizedFrame> {
        self.position_of(index)
            .and_then(|pos| self.slots[pos].as_ref())
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn stats(&self) -> &RetentionStats {
        &self.stats
    }

    pub fn low_confidence_frames(&self) -> &[LowConfidenceFrame] {
        &self.low_confidence
    }

    /// 正規化に使った可視度閾値（解析器のランドマーク判定にも使う）
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// 長い欠損で分断された利用可能区間（スロット位置）
    pub fn usable_runs(&self) -> Vec<Range<usize>> {
        gap::runs(&self.slots)
    }

    /// 除外されたフレーム番号
    pub fn excluded_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(pos, _)| self.index_of(pos))
            .collect()
    }
}

pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self::new(config.clone())
    }

    pub fn normalize(&self, sequence: &PoseSequence) -> Result<NormalizedPoseSequence, AnalysisError> {
        let threshold = self.config.confidence_threshold;
        let first_index = sequence.first_index();
        let expected = sequence.span();

        // 補間を最大限に見積もっても足りない入力は展開前に弾く
        let best_case = sequence.best_case_retained(self.config.max_gap_frames);
        if (best_case as f64) < self.config.min_retention as f64 * expected as f64 {
            debug!("at most {} of {} frames can be retained", best_case, expected);
            return Err(AnalysisError::InsufficientData {
                retained: sequence.len(),
                expected,
            });
        }

        let mut slots: Vec<Option<Pose>> = vec![None; expected];
        let mut low_confidence = Vec::new();
        for frame in sequence.frames() {
            match frame.pose.first_invalid(&REQUIRED_LANDMARKS, threshold) {
                Some(landmark) => {
                    let visibility = frame.pose.get(landmark).visibility;
                    debug!(
                        "frame {} excluded: {:?} visibility {:.2}",
                        frame.index, landmark, visibility
                    );
                    low_confidence.push(LowConfidenceFrame {
                        frame: frame.index,
                        landmark,
                        visibility,
                    });
                }
                None => slots[frame.index - first_index] = Some(frame.pose.clone()),
            }
        }
        let observed = slots.iter().filter(|s| s.is_some()).count();

        let filled = gap::fill_gaps(&mut slots, self.config.max_gap_frames);
        let stats = RetentionStats {
            expected,
            observed,
            interpolated: filled.len(),
            retained: observed + filled.len(),
        };

        if stats.retained == 0 || stats.ratio() < self.config.min_retention {
            return Err(AnalysisError::InsufficientData {
                retained: stats.retained,
                expected,
            });
        }

        let reference_pos = self.find_reference(&slots);
        let reference = self.build_reference(&slots, reference_pos, first_index)?;

        let runs = gap::runs(&slots);
        info!(
            "normalized {} frames: {} observed, {} interpolated, {} excluded, {} usable run(s), reference frame {}",
            expected,
            observed,
            stats.interpolated,
            expected - stats.retained,
            runs.len(),
            reference.frame
        );

        let filled_set: std::collections::HashSet<usize> = filled.into_iter().collect();
        let slots = slots
            .into_iter()
            .enumerate()
            .map(|(pos, slot)| {
                slot.map(|pose| NormalizedFrame {
                    index: first_index + pos,
                    pose: Pose::new(std::array::from_fn(|i| reference.apply(&pose.landmarks[i]))),
                    interpolated: filled_set.contains(&pos),
                })
            })
            .collect();

        Ok(NormalizedPoseSequence {
            fps: sequence.fps(),
            first_index,
            slots,
            reference,
            stats,
            low_confidence,
            confidence_threshold: threshold,
        })
    }

    /// 先頭付近で手首中点の移動量が最小のスロット（同値なら早い方）
    fn find_reference(&self, slots: &[Option<Pose>]) -> usize {
        let threshold = self.config.confidence_threshold;
        let retained: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(pos, _)| pos)
            .collect();
        let candidates = self.config.address_search_frames.max(1).min(retained.len());

        let wrist = |pos: usize| -> Option<Vector3<f32>> {
            slots[pos]
                .as_ref()
                .and_then(|p| p.midpoint(LandmarkId::LeftWrist, LandmarkId::RightWrist, threshold))
        };

        let mut best = retained[0];
        let mut best_motion = f32::INFINITY;
        for k in 0..candidates {
            let Some(&next) = retained.get(k + 1) else {
                break;
            };
            let pos = retained[k];
            let motion = match (wrist(pos), wrist(next)) {
                (Some(a), Some(b)) => (b.xy() - a.xy()).norm(),
                _ => continue,
            };
            if motion < best_motion {
                best_motion = motion;
                best = pos;
            }
        }
        best
    }

    fn build_reference(
        &self,
        slots: &[Option<Pose>],
        pos: usize,
        first_index: usize,
    ) -> Result<Reference, AnalysisError> {
        let threshold = self.config.confidence_threshold;
        let frame = first_index + pos;
        let degenerate = AnalysisError::DegenerateScale { frame };
        let pose = slots[pos].as_ref().ok_or_else(|| degenerate.clone())?;

        let shoulders = pose
            .segment(LandmarkId::RightShoulder, LandmarkId::LeftShoulder, threshold)
            .ok_or_else(|| degenerate.clone())?;
        let scale = shoulders.xy().norm();
        if !scale.is_finite() || scale < MIN_REFERENCE_SCALE {
            return Err(degenerate);
        }
        let origin = pose
            .midpoint(LandmarkId::LeftHip, LandmarkId::RightHip, threshold)
            .ok_or(degenerate)?;

        Ok(Reference {
            frame,
            origin: [origin.x, origin.y, origin.z],
            scale,
        })
    }
}
