//! # Dualstream Monitor
//!
//! The [`Monitor`] owns persisted cross-batch state and runs every detector
//! against a training baseline:
//! - performance decay against baseline metrics
//! - feature drift (PSI and two-sample KS)
//! - concept drift over a loss stream (Page-Hinkley)
//! - per-column outliers
//! - answer / reasoning-trace coherence
//!
//! Each check that trips publishes an alert, appends an event to the state
//! log and persists the state before returning.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod monitor;
pub mod report;

pub use monitor::Monitor;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::monitor::{Monitor, PERFORMANCE_METRICS};
    pub use crate::report::{
        ConceptDriftReport, CycleInput, CycleReport, DriftReport, OutlierReport,
        PerformanceReport,
    };
}
