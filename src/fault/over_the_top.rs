//! オーバー・ザ・トップ（アウトサイドイン）のスイングパス測定
//!
//! トップからインパクトまでの後ろ側手首の水平移動方向を、単位ベクトルの和で平均する。
//! 負 = アウトサイドイン、正 = インサイドアウト（度）。
//! 正味でターゲット方向へ進まない窓は InsufficientMotion とし、結果は ±90 度に収まる。
//! 奥行き (z) が窓全体で一定の入力は方向を決められないので MissingDepth を返す。

use std::collections::BTreeMap;

use nalgebra::{Vector2, Vector3};
use tracing::debug;

use super::{require_frame, FaultKind, FaultMeasurement, Orientation};
use crate::classify::{Scorer, SeverityTable};
use crate::config::Config;
use crate::error::FaultError;
use crate::normalize::NormalizedPoseSequence;
use crate::phase::{SegmentationResult, SwingPhase};

/// これ未満の水平移動は方向を持たない（肩幅単位）
const MIN_HORIZONTAL_STEP: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct OverTheTopAnalyzer {
    orientation: Orientation,
    scorer: Scorer,
}

/// 手首パスの推定値
#[derive(Debug, Clone, Copy, PartialEq)]
struct PathEstimate {
    angle_deg: f32,
    segments: usize,
}

impl OverTheTopAnalyzer {
    pub fn from_config(config: &Config) -> Self {
        let scorer = Scorer::new(
            FaultKind::OverTheTop,
            SeverityTable::new(config.classify.over_the_top.clone()),
            config.fault.tour_average_path_deg,
            config.classify.quality,
        );
        Self {
            orientation: Orientation::new(config.fault.handedness),
            scorer,
        }
    }

    pub fn measure(
        &self,
        sequence: &NormalizedPoseSequence,
        segmentation: &SegmentationResult,
    ) -> Result<FaultMeasurement, FaultError> {
        let top = require_frame(segmentation, SwingPhase::Top)?;
        let impact = require_frame(segmentation, SwingPhase::Impact)?;

        let plane = self.shoulder_plane_deg(sequence, top)?;
        let path = self.wrist_path(sequence, top, impact)?;
        debug!(
            "over-the-top: path {:.2} deg over {} segment(s), shoulder plane {:.2} deg",
            path.angle_deg, path.segments, plane
        );

        let mut details = BTreeMap::new();
        details.insert("shoulder_plane_at_top_deg".to_string(), plane);
        details.insert("path_segments".to_string(), path.segments as f32);
        details.insert("top_frame".to_string(), top as f32);
        details.insert("impact_frame".to_string(), impact as f32);

        Ok(self.scorer.score(path.angle_deg, sequence.stats(), details))
    }

    /// トップでの肩ライン（後ろ肩 → 前肩）の水平面内角度
    fn shoulder_plane_deg(&self, sequence: &NormalizedPoseSequence, top: usize) -> Result<f32, FaultError> {
        let threshold = sequence.confidence_threshold();
        let trail = self.orientation.trailing_shoulder();
        let lead = self.orientation.lead_shoulder();

        let frame = sequence.frame(top).ok_or(FaultError::MissingLandmark {
            landmark: trail,
            frame: top,
        })?;
        let shoulders = frame
            .pose
            .segment(trail, lead, threshold)
            .ok_or_else(|| FaultError::MissingLandmark {
                landmark: frame.pose.first_invalid(&[trail, lead], threshold).unwrap_or(trail),
                frame: top,
            })?;

        let h = self.orientation.horizontal(&shoulders);
        Ok(h.y.atan2(h.x).to_degrees())
    }

    /// 窓 [top, impact] 内で隣り合う有効フレーム間の手首移動を平均した方向
    fn wrist_path(
        &self,
        sequence: &NormalizedPoseSequence,
        top: usize,
        impact: usize,
    ) -> Result<PathEstimate, FaultError> {
        let threshold = sequence.confidence_threshold();
        let wrist = self.orientation.trailing_wrist();

        let mut first_missing = None;
        let positions: Vec<Vector3<f32>> = (top..=impact)
            .filter_map(|index| {
                let position = sequence
                    .frame(index)
                    .map(|f| f.pose.get(wrist))
                    .filter(|lm| lm.is_valid(threshold))
                    .map(|lm| lm.position());
                if position.is_none() && first_missing.is_none() {
                    first_missing = Some(index);
                }
                position
            })
            .collect();

        if positions.len() < 2 {
            return Err(FaultError::MissingLandmark {
                landmark: wrist,
                frame: first_missing.unwrap_or(top),
            });
        }

        let mut sum = Vector2::zeros();
        let mut depth_change = 0.0f32;
        for w in positions.windows(2) {
            let delta = w[1] - w[0];
            depth_change = depth_change.max(delta.z.abs());
            let step = self.orientation.horizontal(&delta);
            let len = step.norm();
            if len > MIN_HORIZONTAL_STEP {
                sum += step / len;
            }
        }
        if sum.norm() <= MIN_HORIZONTAL_STEP || sum.x <= MIN_HORIZONTAL_STEP {
            return Err(FaultError::InsufficientMotion);
        }
        if depth_change <= MIN_HORIZONTAL_STEP {
            return Err(FaultError::MissingDepth { landmark: wrist });
        }

        Ok(PathEstimate {
            angle_deg: sum.y.atan2(sum.x).to_degrees(),
            segments: positions.len() - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Severity;
    use crate::config::{Handedness, NormalizeConfig};
    use crate::normalize::Normalizer;
    use crate::phase::PhaseRange;
    use crate::pose::{Frame, Landmark, LandmarkId, PoseSequence};
    use crate::synthetic;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn normalize(seq: &PoseSequence) -> NormalizedPoseSequence {
        Normalizer::new(NormalizeConfig::default()).normalize(seq).unwrap()
    }

    /// 設計値どおりのフェーズ分割
    fn design_segmentation() -> SegmentationResult {
        let mut phases = std::collections::BTreeMap::new();
        phases.insert(SwingPhase::Top, PhaseRange::single(synthetic::TOP_FRAME));
        phases.insert(SwingPhase::Impact, PhaseRange::single(synthetic::IMPACT_FRAME));
        SegmentationResult::new(phases, Vec::new())
    }

    fn analyzer(handedness: Handedness) -> OverTheTopAnalyzer {
        let mut config = Config::default();
        config.fault.handedness = handedness;
        OverTheTopAnalyzer::from_config(&config)
    }

    /// 左右反転した（左打ちの）シーケンス
    fn mirrored(seq: &PoseSequence) -> PoseSequence {
        let flip = |id: LandmarkId| -> LandmarkId {
            let i = id as usize;
            let j = if i == 0 { 0 } else if i % 2 == 1 { i + 1 } else { i - 1 };
            LandmarkId::from_index(j).unwrap()
        };
        let frames = seq
            .frames()
            .iter()
            .map(|frame| {
                let mut pose = frame.pose.clone();
                for id in LandmarkId::ALL {
                    let lm = *frame.pose.get(id);
                    pose.set(flip(id), Landmark { x: 1.0 - lm.x, ..lm });
                }
                Frame::new(frame.index, pose)
            })
            .collect();
        PoseSequence::new(frames, seq.fps()).unwrap()
    }

    #[test]
    fn test_out_to_in_path() {
        let normalized = normalize(&synthetic::swing(-8.0));
        let m = analyzer(Handedness::Right)
            .measure(&normalized, &design_segmentation())
            .unwrap();

        assert_eq!(m.fault, FaultKind::OverTheTop);
        assert!(approx_eq_f32(m.value_degrees, -8.0, 0.05), "value {}", m.value_degrees);
        assert_eq!(m.severity, Severity::SignificantOutToIn);
        assert!(approx_eq_f32(m.benchmark_delta, m.value_degrees - 1.5, 1e-6));
        assert_eq!(m.details["path_segments"], 15.0);
        assert_eq!(m.details["top_frame"], 25.0);
    }

    #[test]
    fn test_in_to_out_path() {
        let normalized = normalize(&synthetic::swing(5.0));
        let m = analyzer(Handedness::Right)
            .measure(&normalized, &design_segmentation())
            .unwrap();
        assert!(approx_eq_f32(m.value_degrees, 5.0, 0.05), "value {}", m.value_degrees);
        assert_eq!(m.severity, Severity::InToOut);
    }

    #[test]
    fn test_shoulder_plane_at_top() {
        let normalized = normalize(&synthetic::swing(-8.0));
        let m = analyzer(Handedness::Right)
            .measure(&normalized, &design_segmentation())
            .unwrap();
        // 合成スイングのトップ: 水平回転 60 度、傾き 15 度
        let (turn, tilt) = (60.0f32.to_radians(), 15.0f32.to_radians());
        let expected = turn.sin().atan2(turn.cos() * tilt.cos()).to_degrees();
        assert!(approx_eq_f32(m.details["shoulder_plane_at_top_deg"], expected, 0.01));
    }

    #[test]
    fn test_left_handed_mirror() {
        let seq = synthetic::swing(-8.0);
        let right = analyzer(Handedness::Right)
            .measure(&normalize(&seq), &design_segmentation())
            .unwrap();
        let left = analyzer(Handedness::Left)
            .measure(&normalize(&mirrored(&seq)), &design_segmentation())
            .unwrap();
        assert!(approx_eq_f32(left.value_degrees, right.value_degrees, 1e-3));
        assert!(approx_eq_f32(
            left.details["shoulder_plane_at_top_deg"],
            right.details["shoulder_plane_at_top_deg"],
            1e-3
        ));
    }

    #[test]
    fn test_requires_top_and_impact() {
        let normalized = normalize(&synthetic::swing(-8.0));
        let mut phases = std::collections::BTreeMap::new();
        phases.insert(SwingPhase::Top, PhaseRange::single(25));
        let segmentation = SegmentationResult::new(phases, Vec::new());

        let result = analyzer(Handedness::Right).measure(&normalized, &segmentation);
        assert_eq!(
            result,
            Err(FaultError::SegmentationAmbiguity {
                phase: SwingPhase::Impact
            })
        );
    }

    #[test]
    fn test_excluded_top_frame() {
        let seq = synthetic::with_low_visibility(&synthetic::swing(-8.0), |i| (22..28).contains(&i));
        let normalized = normalize(&seq);
        let result = analyzer(Handedness::Right).measure(&normalized, &design_segmentation());
        assert_eq!(
            result,
            Err(FaultError::MissingLandmark {
                landmark: LandmarkId::RightShoulder,
                frame: 25
            })
        );
    }

    #[test]
    fn test_gap_in_window_is_bridged() {
        let seq = synthetic::with_low_visibility(&synthetic::swing(-8.0), |i| (30..36).contains(&i));
        let normalized = normalize(&seq);
        let m = analyzer(Handedness::Right)
            .measure(&normalized, &design_segmentation())
            .unwrap();
        assert_eq!(m.details["path_segments"], 9.0);
        assert!(approx_eq_f32(m.value_degrees, -8.0, 0.05));
    }

    #[test]
    fn test_static_wrists_are_insufficient_motion() {
        let seq = synthetic::map_landmarks(&synthetic::swing(-8.0), |id, lm| match id {
            LandmarkId::LeftWrist => Landmark { x: 0.51, y: 0.55, z: 0.0, ..lm },
            LandmarkId::RightWrist => Landmark { x: 0.49, y: 0.55, z: 0.0, ..lm },
            _ => lm,
        });
        let normalized = normalize(&seq);
        let result = analyzer(Handedness::Right).measure(&normalized, &design_segmentation());
        assert_eq!(result, Err(FaultError::InsufficientMotion));
    }

    #[test]
    fn test_flat_depth_is_rejected() {
        for path_deg in [-8.0, 5.0] {
            let seq = synthetic::map_landmarks(&synthetic::swing(path_deg), |_, lm| Landmark { z: 0.0, ..lm });
            let normalized = normalize(&seq);
            let result = analyzer(Handedness::Right).measure(&normalized, &design_segmentation());
            assert_eq!(
                result,
                Err(FaultError::MissingDepth {
                    landmark: LandmarkId::RightWrist
                })
            );
        }
    }

    #[test]
    fn test_wrist_moving_away_from_target() {
        // 左右だけ反転すると後ろ側の手首はターゲットと逆向きに動く
        let seq = synthetic::map_landmarks(&synthetic::swing(-8.0), |_, lm| Landmark { x: 1.0 - lm.x, ..lm });
        let normalized = normalize(&seq);
        let result = analyzer(Handedness::Right).measure(&normalized, &design_segmentation());
        assert_eq!(result, Err(FaultError::InsufficientMotion));
    }
}
