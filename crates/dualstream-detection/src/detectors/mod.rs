//! Drift and outlier detectors.
//!
//! - `drift`: Population Stability Index over quantile bins
//! - `ks`: two-sample Kolmogorov-Smirnov test with pluggable p-value
//! - `page_hinkley`: sequential mean-shift (concept drift) detector
//! - `outliers`: per-column z-score scan

pub mod drift;
pub mod ks;
pub mod outliers;
pub mod page_hinkley;
