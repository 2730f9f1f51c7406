use std::ops::{Mul, Sub};

/// 連続する有効フレーム間の中心差分（単位/秒）
///
/// 区間の端では片側差分、孤立フレームは None。
pub fn central_difference<T>(values: &[Option<T>], fps: f32) -> Vec<Option<T>>
where
    T: Copy + Sub<Output = T> + Mul<f32, Output = T>,
{
    (0..values.len())
        .map(|i| {
            let current = values[i]?;
            let prev = if i > 0 { values[i - 1] } else { None };
            let next = values.get(i + 1).copied().flatten();
            match (prev, next) {
                (Some(p), Some(n)) => Some((n - p) * (0.5 * fps)),
                (None, Some(n)) => Some((n - current) * fps),
                (Some(p), None) => Some((current - p) * fps),
                (None, None) => None,
            }
        })
        .collect()
}

/// 角度列（度）の ±180 の折り返しを解消する。欠損をまたいでも直前の有効値に合わせる
pub fn unwrap_degrees(values: &[Option<f32>]) -> Vec<Option<f32>> {
    let mut last: Option<f32> = None;
    values
        .iter()
        .map(|v| {
            let mut angle = (*v)?;
            if let Some(prev) = last {
                while angle - prev > 180.0 {
                    angle -= 360.0;
                }
                while angle - prev < -180.0 {
                    angle += 360.0;
                }
            }
            last = Some(angle);
            Some(angle)
        })
        .collect()
}
