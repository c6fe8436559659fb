/// Arithmetic mean, zero for an empty slice
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Relative improvement from `previous` to `current`. Positive means smaller.
pub fn relative_improvement(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (previous - current) / previous.abs()
}
