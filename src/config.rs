use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::classify::{QualityThresholds, Severity, SeverityBand};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub phase: PhaseConfig,
    #[serde(default)]
    pub fault: FaultConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    /// 必須ランドマークの可視度閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// 線形補間で埋める最大連続欠損フレーム数
    #[serde(default = "default_max_gap_frames")]
    pub max_gap_frames: usize,
    /// 必要な保持フレーム比率
    #[serde(default = "default_min_retention")]
    pub min_retention: f32,
    /// アドレス基準フレームを探す先頭フレーム数
    #[serde(default = "default_address_search_frames")]
    pub address_search_frames: usize,
}

fn default_confidence_threshold() -> f32 { 0.5 }
fn default_max_gap_frames() -> usize { 3 }
fn default_min_retention() -> f32 { 0.7 }
fn default_address_search_frames() -> usize { 15 }

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_gap_frames: default_max_gap_frames(),
            min_retention: default_min_retention(),
            address_search_frames: default_address_search_frames(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    /// 移動平均の窓幅（フレーム、奇数。1 で平滑化なし）
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

fn default_smoothing_window() -> usize { 5 }

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            smoothing_window: default_smoothing_window(),
        }
    }
}

/// 速度の単位はすべて「肩幅/秒」
#[derive(Debug, Clone, Deserialize)]
pub struct PhaseConfig {
    /// これ未満を静止とみなす手首速度
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: f32,
    /// 動き出し確定に必要な連続フレーム数
    #[serde(default = "default_onset_frames")]
    pub onset_frames: usize,
    /// アドレス成立に必要な静止フレーム数
    #[serde(default = "default_address_min_dwell")]
    pub address_min_dwell: usize,
    /// トップ判定の速度反転マージン
    #[serde(default = "default_reversal_margin")]
    pub reversal_margin: f32,
    /// トップまでに必要な肩ラインの回転量（度）
    #[serde(default = "default_min_backswing_turn_deg")]
    pub min_backswing_turn_deg: f32,
    /// 最大速度に対してこの比率を下回ったらインパクト確定
    #[serde(default = "default_impact_confirm_ratio")]
    pub impact_confirm_ratio: f32,
    /// フィニッシュ判定の速度閾値
    #[serde(default = "default_finish_threshold")]
    pub finish_threshold: f32,
    /// フィニッシュ成立に必要な静止フレーム数
    #[serde(default = "default_finish_min_dwell")]
    pub finish_min_dwell: usize,
    /// 極値の同値判定幅
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f32,
}

fn default_motion_threshold() -> f32 { 0.5 }
fn default_onset_frames() -> usize { 3 }
fn default_address_min_dwell() -> usize { 5 }
fn default_reversal_margin() -> f32 { 0.3 }
fn default_min_backswing_turn_deg() -> f32 { 3.0 }
fn default_impact_confirm_ratio() -> f32 { 0.5 }
fn default_finish_threshold() -> f32 { 0.5 }
fn default_finish_min_dwell() -> usize { 5 }
fn default_tie_epsilon() -> f32 { 1e-4 }

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            motion_threshold: default_motion_threshold(),
            onset_frames: default_onset_frames(),
            address_min_dwell: default_address_min_dwell(),
            reversal_margin: default_reversal_margin(),
            min_backswing_turn_deg: default_min_backswing_turn_deg(),
            impact_confirm_ratio: default_impact_confirm_ratio(),
            finish_threshold: default_finish_threshold(),
            finish_min_dwell: default_finish_min_dwell(),
            tie_epsilon: default_tie_epsilon(),
        }
    }
}

/// 利き手。後ろ側の手首とターゲット方向を決める
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Right,
    Left,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaultConfig {
    #[serde(default = "default_handedness")]
    pub handedness: Handedness,
    /// ツアー平均のスイングパス（度、正 = インサイドアウト）
    #[serde(default = "default_tour_average_path_deg")]
    pub tour_average_path_deg: f32,
    /// ツアー平均の肩回転量（度/基準フレーム）
    #[serde(default = "default_tour_average_rotation_deg")]
    pub tour_average_rotation_deg: f32,
    /// ダウンスイング序盤でこれを超えたら早期回転
    #[serde(default = "default_early_rotation_deg")]
    pub early_rotation_deg: f32,
    /// 回転量を換算する基準フレームレート
    #[serde(default = "default_reference_fps")]
    pub reference_fps: f32,
}

fn default_handedness() -> Handedness { Handedness::Right }
fn default_tour_average_path_deg() -> f32 { 1.5 }
fn default_tour_average_rotation_deg() -> f32 { 1.8 }
fn default_early_rotation_deg() -> f32 { 3.0 }
fn default_reference_fps() -> f32 { 30.0 }

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            handedness: default_handedness(),
            tour_average_path_deg: default_tour_average_path_deg(),
            tour_average_rotation_deg: default_tour_average_rotation_deg(),
            early_rotation_deg: default_early_rotation_deg(),
            reference_fps: default_reference_fps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyConfig {
    #[serde(default = "default_over_the_top_bands")]
    pub over_the_top: Vec<SeverityBand>,
    #[serde(default = "default_shoulder_rotation_bands")]
    pub shoulder_rotation: Vec<SeverityBand>,
    #[serde(default)]
    pub quality: QualityThresholds,
}

fn default_over_the_top_bands() -> Vec<SeverityBand> {
    vec![
        SeverityBand::new(f32::NEG_INFINITY, Severity::SignificantOutToIn),
        SeverityBand::new(-6.0, Severity::ModerateOutToIn),
        SeverityBand::new(-2.0, Severity::Neutral),
        SeverityBand::new(2.0, Severity::InToOut),
    ]
}

fn default_shoulder_rotation_bands() -> Vec<SeverityBand> {
    vec![
        SeverityBand::new(f32::NEG_INFINITY, Severity::SlowRotation),
        SeverityBand::new(1.0, Severity::OptimalRotation),
        SeverityBand::new(2.5, Severity::FastRotation),
    ]
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            over_the_top: default_over_the_top_bands(),
            shoulder_rotation: default_shoulder_rotation_bands(),
            quality: QualityThresholds::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// 値の範囲チェック
    pub fn validate(&self) -> Result<()> {
        let window = self.signal.smoothing_window;
        ensure!(
            window % 2 == 1,
            "signal.smoothing_window must be odd (centred window), got {}",
            window
        );
        let retention = self.normalize.min_retention;
        ensure!(
            retention > 0.0 && retention <= 1.0,
            "normalize.min_retention must be in (0, 1], got {}",
            retention
        );
        Ok(())
    }

    /// 読めなければデフォルト設定を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using default configuration", e);
                Self::default()
            }
        }
    }
}
