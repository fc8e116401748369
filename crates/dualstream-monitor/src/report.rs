//! Structured check outcomes.

use dualstream_core::batch::{Batch, Metrics};
use dualstream_core::events::DriftFinding;
use dualstream_detection::coherence::{CoherenceResult, DualStreamRecord};
use dualstream_detection::detectors::outliers::OutlierMap;
use dualstream_detection::detectors::page_hinkley::PageHinkleyState;
use serde::Serialize;

/// Outcome of a performance check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub triggered: bool,
    /// `<metric>_drop` for each metric below baseline minus tolerance
    pub triggers: Vec<String>,
}

/// Outcome of a feature drift check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub triggered: bool,
    /// Numeric features present in both batches
    pub evaluated: Vec<String>,
    /// Features whose PSI or KS p-value crossed a threshold
    pub drifted: Vec<DriftFinding>,
}

/// Outcome of a concept drift check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptDriftReport {
    pub triggered: bool,
    /// Finite losses fed to the detector
    pub observations: usize,
    /// Position in the input of the first alarming loss
    pub first_alarm: Option<usize>,
    /// Detector state after the last observation
    pub detector: PageHinkleyState,
}

/// Outcome of an outlier scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub triggered: bool,
    /// Flagged row positions per column; clean columns are absent
    pub outliers: OutlierMap,
}

impl OutlierReport {
    /// Flagged row count per column
    pub fn counts(&self) -> std::collections::BTreeMap<String, usize> {
        self.outliers
            .iter()
            .map(|(column, rows)| (column.clone(), rows.len()))
            .collect()
    }
}

/// Inputs of one monitoring cycle; every part is optional
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleInput<'a> {
    pub reference: Option<&'a Batch>,
    pub current: Option<&'a Batch>,
    pub metrics: Option<&'a Metrics>,
    pub losses: Option<&'a [f64]>,
    pub records: Option<&'a [DualStreamRecord]>,
}

impl<'a> CycleInput<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference and current batch for the drift check; the current batch is
    /// also scanned for outliers
    pub fn with_batches(mut self, reference: &'a Batch, current: &'a Batch) -> Self {
        self.reference = Some(reference);
        self.current = Some(current);
        self
    }

    /// Current batch only (outlier scan)
    pub fn with_current(mut self, current: &'a Batch) -> Self {
        self.current = Some(current);
        self
    }

    pub fn with_metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_losses(mut self, losses: &'a [f64]) -> Self {
        self.losses = Some(losses);
        self
    }

    pub fn with_records(mut self, records: &'a [DualStreamRecord]) -> Self {
        self.records = Some(records);
        self
    }
}

/// Outcome of one monitoring cycle. Each check keeps its own verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// Value of `batches_seen` after this cycle
    pub batch: u64,
    pub performance: Option<PerformanceReport>,
    pub drift: Option<DriftReport>,
    pub concept_drift: Option<ConceptDriftReport>,
    pub outliers: Option<OutlierReport>,
    pub coherence: Option<Vec<CoherenceResult>>,
    /// Alert kinds that justify a retrain; empty when none tripped
    pub retrain_reasons: Vec<String>,
}

impl CycleReport {
    pub fn retrain_recommended(&self) -> bool {
        !self.retrain_reasons.is_empty()
    }

    /// Number of incoherent records audited in this cycle
    pub fn coherence_violations(&self) -> usize {
        self.coherence
            .as_ref()
            .map(|results| results.iter().filter(|r| !r.coherent).count())
            .unwrap_or(0)
    }
}
