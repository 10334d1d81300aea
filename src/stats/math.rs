// src/stats/math.rs

pub fn mean(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        None
    } else {
        Some(vals.iter().sum::<f64>() / vals.len() as f64)
    }
}

/// Sample standard deviation (n − 1); `0.0` for fewer than two values.
pub fn stddev_sample(vals: &[f64]) -> f64 {
    let n = vals.len();
    if n < 2 {
        return 0.0;
    }
    let m = vals.iter().sum::<f64>() / n as f64;
    let ss: f64 = vals.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Median; mean of the middle pair for even counts.
pub fn median(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        return None;
    }
    let mut sorted = vals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Round a derived rating for display and storage, half away from zero.
///
/// Both statistics modes go through here so they always agree.
pub fn round_rating(value: f64) -> i64 {
    value.round() as i64
}

/// `elapsed_per_lap × 1000 / sct`, or `None` when the SCT is unusable.
pub fn derive_rating(elapsed_per_lap: f64, sct: f64) -> Option<f64> {
    (sct > 0.0).then(|| elapsed_per_lap * 1000.0 / sct)
}
