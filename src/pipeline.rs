//! 正規化 → 信号 → フェーズ分割 → フォルト解析 を 1 試技分つなぐ
//!
//! 前段 3 つは逐次。フォルト解析器はスコープ付きスレッドで並列に走らせ、
//! FaultKind の順に結果を集める。

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AnalysisError, LowConfidenceFrame};
use crate::fault::{FaultAnalyzer, FaultKind, FaultMeasurement, FaultReport};
use crate::normalize::{Normalizer, RetentionStats};
use crate::phase::{PhaseSegmenter, SegmentationResult};
use crate::pose::PoseSequence;
use crate::signal::SignalBuilder;

/// 1 試技の解析結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwingAnalysis {
    pub segmentation: SegmentationResult,
    /// FaultKind::ALL の順
    pub reports: Vec<FaultReport>,
    pub retention: RetentionStats,
    pub low_confidence: Vec<LowConfidenceFrame>,
}

impl SwingAnalysis {
    pub fn report(&self, fault: FaultKind) -> Option<&FaultReport> {
        self.reports.iter().find(|r| r.fault == fault)
    }

    pub fn measurement(&self, fault: FaultKind) -> Option<&FaultMeasurement> {
        self.report(fault).and_then(|r| r.measurement())
    }
}

pub struct SwingAnalyzer {
    normalizer: Normalizer,
    signals: SignalBuilder,
    segmenter: PhaseSegmenter,
    analyzers: Vec<FaultAnalyzer>,
}

impl SwingAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            normalizer: Normalizer::from_config(&config.normalize),
            signals: SignalBuilder::from_config(&config.signal),
            segmenter: PhaseSegmenter::from_config(&config.phase),
            analyzers: FaultAnalyzer::all(config),
        }
    }

    /// 1 試技を解析する。正規化できないときだけエラー
    pub fn analyze(&self, sequence: &PoseSequence) -> Result<SwingAnalysis, AnalysisError> {
        let normalized = self.normalizer.normalize(sequence)?;
        let signals = self.signals.build(&normalized);
        let segmentation = self.segmenter.segment(&signals, normalized.excluded_indices());

        let reports = {
            let normalized = &normalized;
            let segmentation = &segmentation;
            std::thread::scope(|scope| {
                let handles: Vec<_> = self
                    .analyzers
                    .iter()
                    .map(|analyzer| {
                        let handle = scope.spawn(move || analyzer.measure(normalized, segmentation));
                        (analyzer.kind(), handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(fault, handle)| {
                        let outcome = handle
                            .join()
                            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                        FaultReport { fault, outcome }
                    })
                    .collect::<Vec<_>>()
            })
        };

        for report in &reports {
            match &report.outcome {
                Ok(m) => info!(
                    "{}: {:.2} deg ({}, {:?} data)",
                    report.fault.name(),
                    m.value_degrees,
                    m.severity.label(),
                    m.data_quality
                ),
                Err(e) => warn!("{}: {}", report.fault.name(), e),
            }
        }

        Ok(SwingAnalysis {
            segmentation,
            reports,
            retention: *normalized.stats(),
            low_confidence: normalized.low_confidence_frames().to_vec(),
        })
    }

    /// 複数試技を独立に解析する。1 つの失敗は他に影響しない
    pub fn analyze_batch(&self, sequences: &[PoseSequence]) -> Vec<Result<SwingAnalysis, AnalysisError>> {
        sequences
            .iter()
            .enumerate()
            .map(|(attempt, sequence)| {
                let result = self.analyze(sequence);
                if let Err(e) = &result {
                    warn!("attempt {} rejected: {}", attempt, e);
                }
                result
            })
            .collect()
    }
}
