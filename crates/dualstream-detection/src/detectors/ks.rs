//! Two-sample Kolmogorov-Smirnov test.
//!
//! The statistic is the largest absolute gap between the two empirical CDFs.
//! Its p-value comes from a [`KsPValue`] strategy chosen at configuration time:
//! [`KolmogorovSeries`] is the accurate default and [`TailApproximation`] the
//! leading-term fallback.

use crate::stats;
use dualstream_core::config::KsMethod;
use serde::{Deserialize, Serialize};

/// Statistic and two-sided p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

impl KsResult {
    /// Result reported when there is nothing to compare
    pub const NEUTRAL: KsResult = KsResult {
        statistic: 0.0,
        p_value: 1.0,
    };
}

/// Two-sided p-value for a KS statistic `d` on samples of size `n1`, `n2`
pub trait KsPValue: Send + Sync + std::fmt::Debug {
    fn p_value(&self, d: f64, n1: usize, n2: usize) -> f64;

    /// Strategy name for logs and reports
    fn name(&self) -> &'static str;
}

/// Effective sample size `n1 * n2 / (n1 + n2)`
fn effective_n(n1: usize, n2: usize) -> f64 {
    let (n1, n2) = (n1 as f64, n2 as f64);
    n1 * n2 / (n1 + n2)
}

/// Kolmogorov limiting distribution with Stephens' small-sample correction:
/// `Q(λ) = 2 Σ (-1)^(k-1) exp(-2 k² λ²)`, `λ = (√n + 0.12 + 0.11/√n) d`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KolmogorovSeries;

impl KolmogorovSeries {
    const MAX_TERMS: usize = 100;
    const EPS_TERM: f64 = 1e-3;
    const EPS_SUM: f64 = 1e-8;

    /// Survival function of the Kolmogorov distribution.
    /// Returns 1.0 where the alternating series does not converge (λ → 0).
    pub fn survival(lambda: f64) -> f64 {
        let a2 = -2.0 * lambda * lambda;
        let mut sign = 2.0;
        let mut sum = 0.0;
        let mut previous = 0.0;

        for k in 1..=Self::MAX_TERMS {
            let kf = k as f64;
            let term = sign * (a2 * kf * kf).exp();
            sum += term;
            if term.abs() <= Self::EPS_TERM * previous || term.abs() <= Self::EPS_SUM * sum {
                return sum.clamp(0.0, 1.0);
            }
            sign = -sign;
            previous = term.abs();
        }
        1.0
    }
}

impl KsPValue for KolmogorovSeries {
    fn p_value(&self, d: f64, n1: usize, n2: usize) -> f64 {
        let en = effective_n(n1, n2).sqrt();
        Self::survival((en + 0.12 + 0.11 / en) * d)
    }

    fn name(&self) -> &'static str {
        "kolmogorov"
    }
}

/// Leading term of the Kolmogorov tail: `2 exp(-2 (d √n)²)`, clamped to [0, 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct TailApproximation;

impl KsPValue for TailApproximation {
    fn p_value(&self, d: f64, n1: usize, n2: usize) -> f64 {
        let lambda = d * effective_n(n1, n2).sqrt();
        (2.0 * (-2.0 * lambda * lambda).exp()).clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "tail_approximation"
    }
}

/// Strategy for a configured method
pub fn strategy(method: KsMethod) -> Box<dyn KsPValue> {
    match method {
        KsMethod::Kolmogorov => Box::new(KolmogorovSeries),
        KsMethod::TailApproximation => Box::new(TailApproximation),
    }
}

/// Largest ECDF gap over the pooled observations; inputs must be sorted
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .chain(b)
        .map(|&x| (stats::ecdf(a, x) - stats::ecdf(b, x)).abs())
        .fold(0.0, f64::max)
}

/// Two-sample KS test.
///
/// Non-finite values are dropped; if either sample ends up empty the result
/// is [`KsResult::NEUTRAL`]. Symmetric in its two samples.
pub fn ks_two_sample(expected: &[f64], actual: &[f64], p_value: &dyn KsPValue) -> KsResult {
    let a = stats::sorted_finite(expected);
    let b = stats::sorted_finite(actual);
    if a.is_empty() || b.is_empty() {
        return KsResult::NEUTRAL;
    }

    let statistic = ks_statistic(&a, &b);
    KsResult {
        statistic,
        p_value: p_value.p_value(statistic, a.len(), b.len()).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(start: f64, n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + i as f64 * step).collect()
    }

    #[test]
    fn test_empty_inputs_are_neutral() {
        let sample = ramp(0.0, 10, 1.0);
        assert_eq!(ks_two_sample(&[], &sample, &KolmogorovSeries), KsResult::NEUTRAL);
        assert_eq!(ks_two_sample(&sample, &[], &TailApproximation), KsResult::NEUTRAL);
        assert_eq!(
            ks_two_sample(&[f64::NAN], &sample, &KolmogorovSeries),
            KsResult::NEUTRAL
        );
    }

    #[test]
    fn test_identical_samples() {
        let sample = ramp(0.0, 100, 1.0);
        for strategy in [strategy(KsMethod::Kolmogorov), strategy(KsMethod::TailApproximation)] {
            let result = ks_two_sample(&sample, &sample, strategy.as_ref());
            assert_eq!(result.statistic, 0.0);
            assert_eq!(result.p_value, 1.0);
        }
    }

    #[test]
    fn test_disjoint_samples() {
        let a = ramp(0.0, 100, 1.0);
        let b = ramp(1000.0, 100, 1.0);
        let result = ks_two_sample(&a, &b, &KolmogorovSeries);
        assert_eq!(result.statistic, 1.0);
        assert!(result.p_value < 1e-10);

        let fallback = ks_two_sample(&a, &b, &TailApproximation);
        assert!(fallback.p_value < 1e-10);
    }

    #[test]
    fn test_statistic_hand_computed() {
        // ECDF gap is largest at x = 2: F_a = 2/3, F_b = 0
        let result = ks_two_sample(&[1.0, 2.0, 3.0], &[2.5, 3.5], &TailApproximation);
        assert!((result.statistic - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tail_approximation_formula() {
        let d: f64 = 0.3;
        let (n1, n2) = (50, 80);
        let en = (50.0 * 80.0 / 130.0_f64).sqrt();
        let expected = 2.0 * (-2.0 * (d * en).powi(2)).exp();
        assert!((TailApproximation.p_value(d, n1, n2) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_series_agrees_with_tail_for_large_lambda() {
        // Higher-order terms vanish far in the tail
        for lambda in [1.5, 2.0, 2.5] {
            let series = KolmogorovSeries::survival(lambda);
            let leading = 2.0 * (-2.0 * lambda * lambda).exp();
            assert!((series - leading).abs() / leading < 1e-3);
        }
    }

    #[test]
    fn test_series_known_values() {
        // Q(1.36) ≈ 0.049 is the classical 5% critical point
        assert!((KolmogorovSeries::survival(1.36) - 0.0494).abs() < 1e-3);
        assert_eq!(KolmogorovSeries::survival(0.0), 1.0);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(strategy(KsMethod::Kolmogorov).name(), "kolmogorov");
        assert_eq!(strategy(KsMethod::TailApproximation).name(), "tail_approximation");
    }

    proptest! {
        #[test]
        fn prop_swap_symmetry(
            a in prop::collection::vec(-1e3f64..1e3, 1..80),
            b in prop::collection::vec(-1e3f64..1e3, 1..80),
        ) {
            for method in [KsMethod::Kolmogorov, KsMethod::TailApproximation] {
                let s = strategy(method);
                let ab = ks_two_sample(&a, &b, s.as_ref());
                let ba = ks_two_sample(&b, &a, s.as_ref());
                prop_assert_eq!(ab.statistic, ba.statistic);
                prop_assert_eq!(ab.p_value, ba.p_value);
                prop_assert!((0.0..=1.0).contains(&ab.p_value));
            }
        }
    }
}
