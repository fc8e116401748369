//! Population Stability Index.
//!
//! Compares the distribution of a current sample against a reference sample
//! by binning both on the reference quantiles:
//!
//! PSI = Σ (actual% - expected%) * ln(actual% / expected%)
//!
//! Conventional reading: < 0.1 stable, 0.1-0.2 moderate shift, >= 0.2 material drift.

use crate::stats;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// PSI binning configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsiConfig {
    /// Number of quantile bins taken from the expected sample
    pub bins: usize,
    /// Proportion substituted for empty bins
    pub floor: f64,
}

impl Default for PsiConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            floor: 1e-6,
        }
    }
}

impl PsiConfig {
    pub fn with_bins(bins: usize) -> Self {
        Self {
            bins,
            ..Self::default()
        }
    }
}

/// PSI of `actual` against `expected`.
///
/// Non-finite values are dropped. Returns 0.0 when either sample is empty or
/// when the expected sample is constant (no bin can be formed).
pub fn population_stability_index(expected: &[f64], actual: &[f64], config: PsiConfig) -> f64 {
    let expected = stats::sorted_finite(expected);
    let actual = stats::finite(actual);
    if expected.is_empty() || actual.is_empty() || config.bins == 0 {
        return 0.0;
    }

    let edges = quantile_edges(&expected, config.bins);
    if edges.len() < 2 {
        return 0.0;
    }

    let expected_pct = bin_proportions(&expected, &edges, config.floor);
    let actual_pct = bin_proportions(&actual, &edges, config.floor);

    let psi = expected_pct
        .iter()
        .zip(&actual_pct)
        .map(|(e, a)| (a - e) * (a / e).ln())
        .sum::<f64>();

    trace!(
        bins = edges.len() - 1,
        expected_samples = expected.len(),
        actual_samples = actual.len(),
        psi,
        "Computed population stability index"
    );

    psi
}

/// Deduplicated quantile cut points with open outer edges
fn quantile_edges(sorted: &[f64], bins: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (0..=bins)
        .map(|i| stats::quantile_sorted(sorted, i as f64 / bins as f64))
        .collect();
    edges.dedup();

    if edges.len() >= 2 {
        let last = edges.len() - 1;
        edges[0] = f64::NEG_INFINITY;
        edges[last] = f64::INFINITY;
    }
    edges
}

/// Share of values per bin `[edge_i, edge_{i+1})`, empty bins floored
fn bin_proportions(values: &[f64], edges: &[f64], floor: f64) -> Vec<f64> {
    let interior = &edges[1..edges.len() - 1];
    let mut counts = vec![0usize; edges.len() - 1];
    for &v in values {
        counts[interior.partition_point(|e| *e <= v)] += 1;
    }

    let total = values.len().max(1) as f64;
    counts
        .into_iter()
        .map(|c| if c == 0 { floor } else { c as f64 / total })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(start: f64, n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + i as f64 * step).collect()
    }

    #[test]
    fn test_psi_identical_samples_is_zero() {
        let sample = ramp(100.0, 200, 0.5);
        assert_eq!(population_stability_index(&sample, &sample, PsiConfig::default()), 0.0);
    }

    #[test]
    fn test_psi_similar_distributions_low() {
        let reference = ramp(100.0, 100, 0.1);
        let current = ramp(100.05, 50, 0.2);
        let psi = population_stability_index(&reference, &current, PsiConfig::default());
        assert!(psi < 0.1, "PSI should be low for similar distributions, got {psi}");
    }

    #[test]
    fn test_psi_shifted_distribution_high() {
        let reference = ramp(100.0, 100, 0.1);
        let current = ramp(200.0, 50, 0.1);
        let psi = population_stability_index(&reference, &current, PsiConfig::default());
        assert!(psi > 0.2, "PSI should be high for a shifted distribution, got {psi}");
    }

    #[test]
    fn test_psi_empty_inputs_are_neutral() {
        let sample = ramp(0.0, 10, 1.0);
        assert_eq!(population_stability_index(&[], &sample, PsiConfig::default()), 0.0);
        assert_eq!(population_stability_index(&sample, &[], PsiConfig::default()), 0.0);
        assert_eq!(
            population_stability_index(&[f64::NAN, f64::INFINITY], &sample, PsiConfig::default()),
            0.0
        );
    }

    #[test]
    fn test_psi_ignores_non_finite_values() {
        let sample = ramp(0.0, 50, 1.0);
        let mut noisy = sample.clone();
        noisy.push(f64::NAN);
        noisy.push(f64::NEG_INFINITY);
        assert_eq!(population_stability_index(&sample, &noisy, PsiConfig::default()), 0.0);
    }

    #[test]
    fn test_psi_constant_expected() {
        let constant = vec![5.0; 20];
        let other = ramp(0.0, 20, 1.0);
        assert_eq!(population_stability_index(&constant, &other, PsiConfig::default()), 0.0);
    }

    #[test]
    fn test_out_of_range_values_fall_in_outer_bins() {
        let reference = ramp(0.0, 100, 1.0);
        let far = vec![1e9; 10];
        let psi = population_stability_index(&reference, &far, PsiConfig::default());
        assert!(psi.is_finite());
        assert!(psi > 1.0);
    }

    #[test]
    fn test_quantile_edges_dedup() {
        let sorted = [1.0, 1.0, 1.0, 2.0];
        let edges = quantile_edges(&sorted, 4);
        assert_eq!(edges.first(), Some(&f64::NEG_INFINITY));
        assert_eq!(edges.last(), Some(&f64::INFINITY));
        assert!(edges.len() < 5);
    }

    proptest! {
        #[test]
        fn prop_psi_self_is_zero(sample in prop::collection::vec(-1e6f64..1e6, 2..200)) {
            let psi = population_stability_index(&sample, &sample, PsiConfig::default());
            prop_assert_eq!(psi, 0.0);
        }

        #[test]
        fn prop_psi_non_negative(
            a in prop::collection::vec(-1e3f64..1e3, 1..100),
            b in prop::collection::vec(-1e3f64..1e3, 1..100),
        ) {
            let psi = population_stability_index(&a, &b, PsiConfig::default());
            prop_assert!(psi >= 0.0);
        }
    }
}
