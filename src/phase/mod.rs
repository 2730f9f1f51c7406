//! スイングフェーズ
//!
//! アドレスからフィニッシュまでの 7 フェーズと、その区間分割結果。

pub mod segmenter;

use std::collections::BTreeMap;

use serde::Serialize;

pub use segmenter::PhaseSegmenter;

/// スイングの 7 フェーズ（時間順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingPhase {
    Address,
    Backswing,
    Top,
    Downswing,
    Impact,
    FollowThrough,
    Finish,
}

impl SwingPhase {
    pub const ALL: [SwingPhase; 7] = [
        SwingPhase::Address,
        SwingPhase::Backswing,
        SwingPhase::Top,
        SwingPhase::Downswing,
        SwingPhase::Impact,
        SwingPhase::FollowThrough,
        SwingPhase::Finish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SwingPhase::Address => "address",
            SwingPhase::Backswing => "backswing",
            SwingPhase::Top => "top",
            SwingPhase::Downswing => "downswing",
            SwingPhase::Impact => "impact",
            SwingPhase::FollowThrough => "follow_through",
            SwingPhase::Finish => "finish",
        }
    }
}

/// フレーム番号の閉区間 [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseRange {
    pub start: usize,
    pub end: usize,
}

impl PhaseRange {
    /// start > end なら空区間として None
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(frame: usize) -> Self {
        Self { start: frame, end: frame }
    }

    pub fn frame_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.start <= frame && frame <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentQuality {
    Complete,
    /// 検出できなかったフェーズがある
    Degraded { unresolved: Vec<SwingPhase> },
}

/// フェーズ分割結果（生成後は不変）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationResult {
    phases: BTreeMap<SwingPhase, PhaseRange>,
    excluded: Vec<usize>,
    quality: SegmentQuality,
}

impl SegmentationResult {
    /// 区間が無いフェーズを未解決として品質を決める
    pub fn new(phases: BTreeMap<SwingPhase, PhaseRange>, excluded: Vec<usize>) -> Self {
        let unresolved: Vec<SwingPhase> = SwingPhase::ALL
            .into_iter()
            .filter(|phase| !phases.contains_key(phase))
            .collect();
        let quality = if unresolved.is_empty() {
            SegmentQuality::Complete
        } else {
            SegmentQuality::Degraded { unresolved }
        };
        Self {
            phases,
            excluded,
            quality,
        }
    }

    pub fn range(&self, phase: SwingPhase) -> Option<PhaseRange> {
        self.phases.get(&phase).copied()
    }

    /// フェーズの開始フレーム（Top / Impact は単一フレーム）
    pub fn frame(&self, phase: SwingPhase) -> Option<usize> {
        self.range(phase).map(|r| r.start)
    }

    /// フレームが属するフェーズ
    pub fn phase_at(&self, frame: usize) -> Option<SwingPhase> {
        self.phases
            .iter()
            .find(|(_, range)| range.contains(frame))
            .map(|(phase, _)| *phase)
    }

    pub fn phases(&self) -> impl Iterator<Item = (SwingPhase, PhaseRange)> + '_ {
        self.phases.iter().map(|(phase, range)| (*phase, *range))
    }

    /// 除外されたフレーム番号（区間内にあってもよい）
    pub fn excluded(&self) -> &[usize] {
        &self.excluded
    }

    pub fn quality(&self) -> &SegmentQuality {
        &self.quality
    }

    pub fn is_complete(&self) -> bool {
        self.quality == SegmentQuality::Complete
    }
}
