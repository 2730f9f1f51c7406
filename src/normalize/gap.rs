use std::ops::Range;

use crate::pose::Pose;

/// 両側が有効フレームで挟まれた `max_gap` 以下の欠損区間を線形補間で埋める。
/// 端に接する欠損と長い欠損はそのまま残す。
///
/// 戻り値: 補間したスロット位置
pub fn fill_gaps(slots: &mut [Option<Pose>], max_gap: usize) -> Vec<usize> {
    let mut filled = Vec::new();
    let mut pos = 0;

    while pos < slots.len() {
        if slots[pos].is_some() {
            pos += 1;
            continue;
        }

        let start = pos;
        while pos < slots.len() && slots[pos].is_none() {
            pos += 1;
        }
        let end = pos; // 欠損区間は start..end

        if start == 0 || end == slots.len() || end - start > max_gap {
            continue;
        }

        let (left, right) = match (&slots[start - 1], &slots[end]) {
            (Some(l), Some(r)) => (l.clone(), r.clone()),
            _ => continue,
        };
        let steps = (end - start + 1) as f32;
        for (k, slot) in slots[start..end].iter_mut().enumerate() {
            let t = (k + 1) as f32 / steps;
            *slot = Some(left.lerp(&right, t));
            filled.push(start + k);
        }
    }

    filled
}

/// 連続した有効スロットの区間
pub fn runs<T>(slots: &[Option<T>]) -> Vec<Range<usize>> {
    let mut result = Vec::new();
    let mut start = None;
    for (pos, slot) in slots.iter().enumerate() {
        match (slot.is_some(), start) {
            (true, None) => start = Some(pos),
            (false, Some(s)) => {
                result.push(s..pos);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        result.push(s..slots.len());
    }
    result
}
