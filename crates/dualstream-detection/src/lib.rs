//! # Dualstream Detection
//!
//! Stateless and small-state detectors used by the monitor:
//! - `stats`: summary statistics over finite samples
//! - `detectors`: PSI, two-sample KS test, Page-Hinkley, outlier scan
//! - `coherence`: marker-based audit of answer / reasoning-trace pairs

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod coherence;
pub mod detectors;
pub mod stats;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::coherence::{
        CoherenceAuditor, CoherencePolicy, CoherenceResult, DualStreamRecord, GuardDecision,
        MarkerVocabulary,
    };
    pub use crate::detectors::drift::{population_stability_index, PsiConfig};
    pub use crate::detectors::ks::{
        ks_two_sample, KolmogorovSeries, KsPValue, KsResult, TailApproximation,
    };
    pub use crate::detectors::outliers::{OutlierScanner, OutlierMap};
    pub use crate::detectors::page_hinkley::{PageHinkley, PageHinkleyState};
}
