pub mod metrics;
pub mod validation;

/// Rounds to one decimal place, half away from zero, in `f32` so values
/// such as `3.55f32` land on `3.6` as their decimal spelling suggests.
pub fn round_to_one_decimal(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
