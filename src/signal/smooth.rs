/// 中心移動平均（窓内の有効値のみ平均）
///
/// 入力が None の位置は None のまま。窓は端で切り詰める。
/// 窓は中心から左右 `window / 2` なので、偶数を渡すと `window + 1` として働く
/// （設定値は `Config::validate` で奇数に限定している）。
pub fn moving_average(values: &[Option<f32>], window: usize) -> Vec<Option<f32>> {
    if window <= 1 {
        return values.to_vec();
    }
    let half = window / 2;

    (0..values.len())
        .map(|i| {
            values[i]?;
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            let (sum, count) = values[lo..hi]
                .iter()
                .flatten()
                .fold((0.0f32, 0usize), |(s, c), v| (s + v, c + 1));
            Some(sum / count as f32)
        })
        .collect()
}
