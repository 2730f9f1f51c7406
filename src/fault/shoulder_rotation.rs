//! ダウンスイングの肩回転速度
//!
//! トップからインパクトまでの肩ライン角度の変化を、基準フレームレート換算の
//! 度/フレームで平均する。序盤 1/3 の回転が速すぎる場合は早期回転とみなす。

use std::collections::BTreeMap;

use tracing::debug;

use super::{require_frame, FaultKind, FaultMeasurement, Orientation};
use crate::classify::{Scorer, SeverityTable};
use crate::config::Config;
use crate::error::FaultError;
use crate::normalize::NormalizedPoseSequence;
use crate::phase::{SegmentationResult, SwingPhase};
use crate::pose::LandmarkId;
use crate::signal::{line_angle_deg, unwrap_degrees};

#[derive(Debug, Clone)]
pub struct ShoulderRotationAnalyzer {
    orientation: Orientation,
    reference_fps: f32,
    early_rotation_deg: f32,
    scorer: Scorer,
}

impl ShoulderRotationAnalyzer {
    pub fn from_config(config: &Config) -> Self {
        let scorer = Scorer::new(
            FaultKind::ShoulderRotation,
            SeverityTable::new(config.classify.shoulder_rotation.clone()),
            config.fault.tour_average_rotation_deg,
            config.classify.quality,
        );
        Self {
            orientation: Orientation::new(config.fault.handedness),
            reference_fps: config.fault.reference_fps,
            early_rotation_deg: config.fault.early_rotation_deg,
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
        let threshold = sequence.confidence_threshold();

        let mut first_missing = None;
        let mut frames = Vec::new();
        let mut angles = Vec::new();
        for index in top..=impact {
            let angle = sequence.frame(index).and_then(|f| {
                line_angle_deg(&f.pose, LandmarkId::RightShoulder, LandmarkId::LeftShoulder, threshold)
            });
            match angle {
                Some(a) => {
                    frames.push(index);
                    angles.push(Some(a));
                }
                None if first_missing.is_none() => first_missing = Some(index),
                None => {}
            }
        }
        let angles: Vec<f32> = unwrap_degrees(&angles).into_iter().flatten().collect();

        // 基準フレームレートでの 1 フレームあたりの回転量
        let per_reference_frame = sequence.fps() / self.reference_fps;
        let steps: Vec<f32> = (1..angles.len())
            .map(|k| {
                let frames_apart = (frames[k] - frames[k - 1]) as f32;
                (angles[k] - angles[k - 1]).abs() / frames_apart * per_reference_frame
            })
            .collect();

        if steps.len() < 2 {
            return Err(FaultError::MissingLandmark {
                landmark: self.orientation.trailing_shoulder(),
                frame: first_missing.unwrap_or(top),
            });
        }

        let rate = mean(&steps);
        let early_steps = if steps.len() >= 3 {
            &steps[..steps.len() / 3]
        } else {
            &steps[..]
        };
        let early_rate = mean(early_steps);
        let early = early_rate > self.early_rotation_deg;
        debug!(
            "shoulder rotation: {:.2} deg/frame over {} step(s), early third {:.2}",
            rate,
            steps.len(),
            early_rate
        );

        let mut details = BTreeMap::new();
        details.insert("early_rotation".to_string(), if early { 1.0 } else { 0.0 });
        details.insert("early_rotation_rate_deg".to_string(), early_rate);
        details.insert("rotation_steps".to_string(), steps.len() as f32);

        Ok(self.scorer.score(rate, sequence.stats(), details))
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}
