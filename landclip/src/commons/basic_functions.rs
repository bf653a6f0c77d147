/// Round `value` to `decimals` decimal places, halves away from zero
pub fn round_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Share of `count` in `total` as a percentage rounded to one decimal.
/// A zero total gives 0.0.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_decimals(100.0 * count as f64 / total as f64, 1)
}
