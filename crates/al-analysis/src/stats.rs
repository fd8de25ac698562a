//! Small descriptive-statistics helpers over f64 samples.
//!
//! Quartiles are index-based (`values[n/4]`, `values[3n/4]` on the sorted
//! sample), not interpolated, so downstream numbers match the historical
//! analysis pipeline digit for digit.

/// Multiplier on the standard error for a 95% normal-approximation CI.
pub const CI_Z: f64 = 1.96;

/// IQR fence multiplier for outlier detection.
pub const IQR_FENCE: f64 = 1.5;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of the sample. Averages the two middle elements for even n.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Sample standard deviation (n − 1 denominator). Defined as 0 for n <= 1.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// 95% confidence interval on the mean, mean ± 1.96·stderr.
pub fn confidence_interval_95(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let m = mean(values);
    let stderr = sample_std(values) / (values.len() as f64).sqrt();
    (m - CI_Z * stderr, m + CI_Z * stderr)
}

/// Values outside the 1.5×IQR fences, in input order.
pub fn iqr_outliers(values: &[f64]) -> Vec<f64> {
    if values.len() < 4 {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;
    values
        .iter()
        .copied()
        .filter(|v| *v < lower || *v > upper)
        .collect()
}
