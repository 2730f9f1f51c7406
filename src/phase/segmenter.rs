//! 手首速度と肩ライン角度によるフェーズ分割
//!
//! 左から右への一回の走査で、現在のフェーズを状態として持ち回す。
//! 極値を確定したときだけ、極値の次のスロットから新しい状態で読み直す。
//! 信号の無いスロット（除外フレーム）はカウンタを進めもリセットもしない。

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::{PhaseRange, SegmentQuality, SegmentationResult, SwingPhase};
use crate::config::PhaseConfig;
use crate::signal::SwingSignals;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    pos: usize,
    speed: f32,
}

/// 走査中の状態（スロット位置で保持）
#[derive(Debug, Clone, PartialEq)]
enum State {
    Address {
        still_run: usize,
        last_still: Option<usize>,
        onset_run: usize,
        /// 動き出し直前の静止フレーム数と最後の静止フレーム
        dwell: usize,
        anchor: Option<usize>,
    },
    Backswing {
        start: usize,
        peak: Option<Sample>,
        min: Option<Sample>,
    },
    Downswing {
        start: usize,
        max: Option<Sample>,
    },
    FollowThrough {
        start: usize,
        below_run: usize,
        run_start: Option<usize>,
    },
    Finish {
        start: usize,
    },
}

impl State {
    fn initial() -> Self {
        State::Address {
            still_run: 0,
            last_still: None,
            onset_run: 0,
            dwell: 0,
            anchor: None,
        }
    }

    fn phase(&self) -> SwingPhase {
        match self {
            State::Address { .. } => SwingPhase::Address,
            State::Backswing { .. } => SwingPhase::Backswing,
            State::Downswing { .. } => SwingPhase::Downswing,
            State::FollowThrough { .. } => SwingPhase::FollowThrough,
            State::Finish { .. } => SwingPhase::Finish,
        }
    }
}

/// 1 回の分割処理の作業領域
struct Scan<'a> {
    config: &'a PhaseConfig,
    shoulder: &'a [Option<f32>],
    address_angle: Option<f32>,
    /// フェーズ → スロット位置の閉区間
    ranges: BTreeMap<SwingPhase, (usize, usize)>,
}

impl Scan<'_> {
    fn close(&mut self, phase: SwingPhase, start: usize, end: usize) {
        if start <= end {
            self.ranges.insert(phase, (start, end));
        }
    }

    /// 肩ラインがアドレスから十分回ったか（角度不明なら判定しない）
    fn turned_enough(&self, pos: usize) -> bool {
        match (self.address_angle, self.shoulder.get(pos).copied().flatten()) {
            (Some(address), Some(angle)) => (angle - address).abs() >= self.config.min_backswing_turn_deg,
            _ => true,
        }
    }

    /// 1 サンプル進める。戻り値の 2 番目は読み直し開始位置
    fn step(&mut self, state: State, s: Sample) -> (State, Option<usize>) {
        let cfg = self.config;
        let eps = cfg.tie_epsilon;

        match state {
            State::Address {
                mut still_run,
                mut last_still,
                mut onset_run,
                mut dwell,
                mut anchor,
            } => {
                if s.speed < cfg.motion_threshold {
                    if onset_run > 0 {
                        onset_run = 0;
                        still_run = 0;
                    }
                    still_run += 1;
                    last_still = Some(s.pos);
                } else {
                    if onset_run == 0 {
                        dwell = still_run;
                        anchor = last_still;
                    }
                    onset_run += 1;
                    if onset_run >= cfg.onset_frames.max(1) {
                        let start = match anchor {
                            Some(a) if dwell >= cfg.address_min_dwell => {
                                self.close(SwingPhase::Address, 0, a);
                                self.address_angle = self.shoulder.get(a).copied().flatten();
                                a + 1
                            }
                            _ => {
                                // アドレス未確定なら先頭の肩角度を基準にする
                                self.address_angle = self.shoulder.iter().flatten().next().copied();
                                0
                            }
                        };
                        debug!("motion onset confirmed at slot {}, backswing from {}", s.pos, start);
                        let next = State::Backswing {
                            start,
                            peak: None,
                            min: None,
                        };
                        return (next, Some(start));
                    }
                }
                let next = State::Address {
                    still_run,
                    last_still,
                    onset_run,
                    dwell,
                    anchor,
                };
                (next, None)
            }

            State::Backswing {
                start,
                mut peak,
                mut min,
            } => {
                match peak {
                    Some(p) if s.speed <= p.speed + eps => match min {
                        Some(m) if s.speed >= m.speed - eps => {
                            let reversed = s.speed >= m.speed + cfg.reversal_margin
                                && p.speed - m.speed >= cfg.reversal_margin;
                            if reversed && self.turned_enough(m.pos) {
                                self.close(SwingPhase::Backswing, start, m.pos.saturating_sub(1));
                                self.close(SwingPhase::Top, m.pos, m.pos);
                                debug!("top at slot {} (speed {:.3}, peak {:.3})", m.pos, m.speed, p.speed);
                                let next = State::Downswing {
                                    start: m.pos + 1,
                                    max: None,
                                };
                                return (next, Some(m.pos + 1));
                            }
                        }
                        _ => min = Some(s),
                    },
                    _ => {
                        peak = Some(s);
                        min = None;
                    }
                }
                (State::Backswing { start, peak, min }, None)
            }

            State::Downswing { start, mut max } => {
                match max {
                    Some(m) if s.speed <= m.speed + eps => {
                        if s.speed < cfg.impact_confirm_ratio * m.speed {
                            self.close(SwingPhase::Downswing, start, m.pos.saturating_sub(1));
                            self.close(SwingPhase::Impact, m.pos, m.pos);
                            debug!("impact at slot {} (speed {:.3})", m.pos, m.speed);
                            let next = State::FollowThrough {
                                start: m.pos + 1,
                                below_run: 0,
                                run_start: None,
                            };
                            return (next, Some(m.pos + 1));
                        }
                    }
                    _ => max = Some(s),
                }
                (State::Downswing { start, max }, None)
            }

            State::FollowThrough {
                start,
                mut below_run,
                mut run_start,
            } => {
                if s.speed < cfg.finish_threshold {
                    let first = *run_start.get_or_insert(s.pos);
                    below_run += 1;
                    if below_run >= cfg.finish_min_dwell.max(1) {
                        self.close(SwingPhase::FollowThrough, start, first.saturating_sub(1));
                        debug!("finish from slot {}", first);
                        return (State::Finish { start: first }, None);
                    }
                } else {
                    below_run = 0;
                    run_start = None;
                }
                (
                    State::FollowThrough {
                        start,
                        below_run,
                        run_start,
                    },
                    None,
                )
            }

            State::Finish { start } => (State::Finish { start }, None),
        }
    }

    /// 走査終了。進行中のフェーズは末尾まで延ばす
    fn finish(&mut self, state: &State, last: usize) {
        let start = match *state {
            State::Address { .. } => 0,
            State::Backswing { start, .. }
            | State::Downswing { start, .. }
            | State::FollowThrough { start, .. }
            | State::Finish { start } => start,
        };
        self.close(state.phase(), start, last);
    }
}

/// フェーズ分割器
pub struct PhaseSegmenter {
    config: PhaseConfig,
}

impl PhaseSegmenter {
    pub fn new(config: PhaseConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &PhaseConfig) -> Self {
        Self::new(config.clone())
    }

    /// 信号列をフェーズに分割する。失敗はせず、未検出フェーズは品質に記録する
    ///
    /// `excluded`: 除外フレーム番号（結果にそのまま載せる）
    pub fn segment(&self, signals: &SwingSignals, excluded: Vec<usize>) -> SegmentationResult {
        let n = signals.wrist_speed.len();
        let mut scan = Scan {
            config: &self.config,
            shoulder: &signals.shoulder_angle,
            address_angle: None,
            ranges: BTreeMap::new(),
        };

        let mut state = State::initial();
        let mut pos = 0;
        while pos < n {
            let Some(speed) = signals.wrist_speed[pos] else {
                pos += 1;
                continue;
            };
            let (next, resume) = scan.step(state, Sample { pos, speed });
            state = next;
            pos = resume.unwrap_or(pos + 1);
        }
        if n > 0 {
            scan.finish(&state, n - 1);
        }

        let phases = scan
            .ranges
            .into_iter()
            .filter_map(|(phase, (start, end))| {
                PhaseRange::new(signals.index_of(start), signals.index_of(end)).map(|r| (phase, r))
            })
            .collect();
        let result = SegmentationResult::new(phases, excluded);

        if let SegmentQuality::Degraded { unresolved } = result.quality() {
            warn!("segmentation degraded: unresolved {:?}", unresolved);
        }
        result
    }
}
