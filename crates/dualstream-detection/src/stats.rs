//! Summary statistics over numeric samples.
//!
//! All helpers work on already-filtered finite data unless stated otherwise.

/// Keep only finite values
pub fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Finite values sorted ascending
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out = finite(values);
    out.sort_by(f64::total_cmp);
    out
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n); 0.0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median of an unsorted slice; 0.0 for an empty slice
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

/// Quantile of a sorted slice with linear interpolation between order
/// statistics (position `q * (n - 1)`); 0.0 for an empty slice
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Right-continuous empirical CDF of a sorted sample at `x`
pub fn ecdf(sorted: &[f64], x: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.partition_point(|v| *v <= x) as f64 / sorted.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_filter() {
        let values = [1.0, f64::NAN, 2.0, f64::INFINITY, f64::NEG_INFINITY];
        assert_eq!(finite(&values), vec![1.0, 2.0]);
    }

    #[test]
    fn test_mean_and_std() {
        let values = [0.0, 0.0, 0.0, 0.0, 100.0];
        assert_eq!(mean(&values), 20.0);
        assert_eq!(std_dev(&values), 40.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_quantile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 5.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 3.0);
        assert!((quantile_sorted(&sorted, 0.1) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_ecdf_right_continuous() {
        let sorted = [1.0, 2.0, 2.0, 3.0];
        assert_eq!(ecdf(&sorted, 0.5), 0.0);
        assert_eq!(ecdf(&sorted, 2.0), 0.75);
        assert_eq!(ecdf(&sorted, 3.0), 1.0);
    }
}
