//! 連続値の測定結果を重症度カテゴリとデータ品質に変換する。
//!
//! 閾値はすべて設定可能な定数で、学習はしない。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fault::{FaultKind, FaultMeasurement};
use crate::normalize::RetentionStats;

/// 重症度カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    SignificantOutToIn,
    ModerateOutToIn,
    Neutral,
    InToOut,
    SlowRotation,
    OptimalRotation,
    FastRotation,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::SignificantOutToIn => "Significant OTT",
            Severity::ModerateOutToIn => "Moderate OTT",
            Severity::Neutral => "Neutral/optimal",
            Severity::InToOut => "In-to-out",
            Severity::SlowRotation => "Slow rotation",
            Severity::OptimalRotation => "Optimal rotation",
            Severity::FastRotation => "Fast rotation",
        }
    }
}

/// `from` 以上の値がこのカテゴリ（次のバンドの `from` まで）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SeverityBand {
    pub from: f32,
    pub severity: Severity,
}

impl SeverityBand {
    pub fn new(from: f32, severity: Severity) -> Self {
        Self { from, severity }
    }
}

/// 昇順の閾値テーブル。バンドの並び順がそのまま順位になる
#[derive(Debug, Clone)]
pub struct SeverityTable {
    bands: Vec<SeverityBand>,
}

impl SeverityTable {
    /// `from` で昇順に並べ替える。空テーブルは Neutral のみとみなす
    pub fn new(mut bands: Vec<SeverityBand>) -> Self {
        if bands.is_empty() {
            bands.push(SeverityBand::new(f32::NEG_INFINITY, Severity::Neutral));
        }
        bands.sort_by(|a, b| a.from.total_cmp(&b.from));
        Self { bands }
    }

    pub fn bands(&self) -> &[SeverityBand] {
        &self.bands
    }

    /// 値が到達した最後のバンドの位置（境界値は上のバンド）
    pub fn rank(&self, value: f32) -> usize {
        self.bands
            .iter()
            .rposition(|band| value >= band.from)
            .unwrap_or(0)
    }

    pub fn classify(&self, value: f32) -> Severity {
        self.bands[self.rank(value)].severity
    }
}

/// 保持フレーム数と比率から決まるデータ品質
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct QualityLevel {
    pub min_frames: usize,
    pub min_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct QualityThresholds {
    #[serde(default = "default_excellent")]
    pub excellent: QualityLevel,
    #[serde(default = "default_good")]
    pub good: QualityLevel,
    #[serde(default = "default_fair")]
    pub fair: QualityLevel,
}

fn default_excellent() -> QualityLevel { QualityLevel { min_frames: 30, min_ratio: 0.9 } }
fn default_good() -> QualityLevel { QualityLevel { min_frames: 20, min_ratio: 0.8 } }
fn default_fair() -> QualityLevel { QualityLevel { min_frames: 10, min_ratio: 0.7 } }

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            excellent: default_excellent(),
            good: default_good(),
            fair: default_fair(),
        }
    }
}

impl QualityThresholds {
    /// 測定値には依存しない
    pub fn assess(&self, stats: &RetentionStats) -> DataQuality {
        let frames = stats.retained;
        let ratio = stats.ratio();
        let meets = |level: &QualityLevel| frames >= level.min_frames && ratio >= level.min_ratio;

        if meets(&self.excellent) {
            DataQuality::Excellent
        } else if meets(&self.good) {
            DataQuality::Good
        } else if meets(&self.fair) {
            DataQuality::Fair
        } else {
            DataQuality::Poor
        }
    }
}

/// 1 つのフォルトの測定値に重症度・ツアー平均との差・データ品質を付ける
#[derive(Debug, Clone)]
pub struct Scorer {
    fault: FaultKind,
    table: SeverityTable,
    tour_average: f32,
    quality: QualityThresholds,
}

impl Scorer {
    pub fn new(fault: FaultKind, table: SeverityTable, tour_average: f32, quality: QualityThresholds) -> Self {
        Self {
            fault,
            table,
            tour_average,
            quality,
        }
    }

    pub fn score(
        &self,
        value_degrees: f32,
        stats: &RetentionStats,
        details: BTreeMap<String, f32>,
    ) -> FaultMeasurement {
        FaultMeasurement {
            fault: self.fault,
            value_degrees,
            severity: self.table.classify(value_degrees),
            benchmark_delta: value_degrees - self.tour_average,
            data_quality: self.quality.assess(stats),
            details,
        }
    }
}
