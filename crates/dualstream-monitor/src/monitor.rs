//! Monitor orchestrator.

use crate::report::{
    ConceptDriftReport, CycleInput, CycleReport, DriftReport, OutlierReport, PerformanceReport,
};
use dualstream_alerting::{build_sink, AlertEmitter, AlertSink};
use dualstream_core::batch::{metric_value, Baseline, Batch, Metrics};
use dualstream_core::config::MonitorConfig;
use dualstream_core::events::{AlertKind, DriftFinding, EventDetail};
use dualstream_core::state::MonitorState;
use dualstream_core::Result;
use dualstream_detection::coherence::{
    CoherenceAuditor, CoherencePolicy, CoherenceResult, DualStreamRecord, MarkerVocabulary,
};
use dualstream_detection::detectors::drift::{population_stability_index, PsiConfig};
use dualstream_detection::detectors::ks::{self, ks_two_sample, KsPValue};
use dualstream_detection::detectors::outliers::OutlierScanner;
use dualstream_detection::detectors::page_hinkley::PageHinkley;
use dualstream_storage::file::JsonFileStore;
use dualstream_storage::StateStore;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// Metrics compared against the baseline, each with a `<metric>_drop` tolerance
pub const PERFORMANCE_METRICS: [&str; 3] = ["accuracy", "f1", "auc"];

/// Stateful monitor for one deployed model.
///
/// Owns the persisted [`MonitorState`] exclusively: every mutation goes
/// through `&mut self` and is written back to the store before the check
/// returns. Data problems (missing columns, empty or non-finite samples)
/// degrade to "no signal"; only store and sink failures are errors.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    baseline: Baseline,
    state: MonitorState,
    store: Box<dyn StateStore>,
    alerts: AlertEmitter,
    page_hinkley: PageHinkley,
    auditor: CoherenceAuditor,
    scanner: OutlierScanner,
    ks: Box<dyn KsPValue>,
    psi: PsiConfig,
}

impl Monitor {
    /// Create a monitor over explicit storage and alert backends.
    ///
    /// Validates the configuration and loads any previously persisted state.
    pub fn new(
        config: MonitorConfig,
        baseline: Baseline,
        store: Box<dyn StateStore>,
        sink: Box<dyn AlertSink>,
    ) -> Result<Self> {
        config.validate()?;
        let state = store.load()?.unwrap_or_default();

        info!(
            store = %store.location(),
            sink = sink.name(),
            batches_seen = state.batches_seen,
            events = state.events().len(),
            "Monitor initialized"
        );

        Ok(Self {
            page_hinkley: PageHinkley::new(config.page_hinkley),
            auditor: CoherenceAuditor::new(
                CoherencePolicy::from(&config.thresholds),
                MarkerVocabulary::default(),
            ),
            scanner: OutlierScanner::new(config.outlier_method, config.outlier_z),
            ks: ks::strategy(config.ks_method),
            psi: PsiConfig::with_bins(config.psi_bins),
            alerts: AlertEmitter::new(sink),
            config,
            baseline,
            state,
            store,
        })
    }

    /// Create a monitor persisting to `<output_dir>/state.json` and alerting
    /// through the configured sink
    pub fn open(config: MonitorConfig, baseline: Baseline) -> Result<Self> {
        config.validate()?;
        let sink = build_sink(Some(config.alert_sink.as_str()), &config.output_dir)?;
        let store = Box::new(JsonFileStore::new(config.state_path()));
        Self::new(config, baseline, store, sink)
    }

    /// Replace the marker vocabularies used by the coherence audit
    pub fn with_vocabulary(mut self, vocabulary: MarkerVocabulary) -> Self {
        self.auditor = CoherenceAuditor::new(*self.auditor.policy(), vocabulary);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn page_hinkley(&self) -> &PageHinkley {
        &self.page_hinkley
    }

    pub fn auditor(&self) -> &CoherenceAuditor {
        &self.auditor
    }

    /// Write the current state to the store
    pub fn save_state(&mut self) -> Result<()> {
        self.store.save(&self.state)
    }

    /// Compare evaluation metrics against the baseline
    #[instrument(skip_all)]
    pub fn check_performance(&mut self, metrics: &Metrics) -> Result<PerformanceReport> {
        let report = self.evaluate_performance(metrics)?;
        if report.triggered {
            self.save_state()?;
        }
        Ok(report)
    }

    /// Compare the numeric features of `current` against `reference`
    #[instrument(skip_all, fields(rows = current.len()))]
    pub fn check_drift(&mut self, reference: &Batch, current: &Batch) -> Result<DriftReport> {
        let report = self.evaluate_drift(reference, current)?;
        if report.triggered {
            self.save_state()?;
        }
        Ok(report)
    }

    /// Feed a loss stream to the Page-Hinkley detector
    #[instrument(skip_all, fields(losses = losses.len()))]
    pub fn check_concept_drift(&mut self, losses: &[f64]) -> Result<ConceptDriftReport> {
        let report = self.evaluate_concept_drift(losses)?;
        if report.triggered {
            self.save_state()?;
        }
        Ok(report)
    }

    /// Scan the feature columns of a batch for outliers
    #[instrument(skip_all, fields(rows = batch.len()))]
    pub fn check_outliers(&mut self, batch: &Batch) -> Result<OutlierReport> {
        let report = self.evaluate_outliers(batch)?;
        if report.triggered {
            self.save_state()?;
        }
        Ok(report)
    }

    /// Audit answer / reasoning-trace pairs, one result per record in order.
    ///
    /// Each incoherent record is published as a `coherence_violation` alert.
    /// The state log is not touched.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn audit_dual_streams(&self, records: &[DualStreamRecord]) -> Result<Vec<CoherenceResult>> {
        let mut results = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let result = self.auditor.audit_record(record);
            if !result.coherent {
                warn!(index, reasons = ?result.reasons, "Coherence violation");
                metrics::counter!("dualstream_coherence_violations_total").increment(1);
                self.alerts
                    .emit(AlertKind::CoherenceViolation, serde_json::to_value(&result)?)?;
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Process one batch: count it, run every check whose inputs are
    /// present, and recommend a retrain when performance, drift or concept
    /// drift tripped. State is persisted once at the end.
    ///
    /// A failed cycle leaves the in-memory state and the concept drift
    /// detector as they were before the call.
    #[instrument(skip_all, fields(batch = self.state.batches_seen + 1))]
    pub fn run_cycle(&mut self, input: CycleInput<'_>) -> Result<CycleReport> {
        let state = self.state.clone();
        let page_hinkley = self.page_hinkley.clone();

        let result = self.run_cycle_inner(input);
        if let Err(err) = &result {
            warn!(error = %err, "Cycle failed, state rolled back");
            self.state = state;
            self.page_hinkley = page_hinkley;
        }
        result
    }

    fn run_cycle_inner(&mut self, input: CycleInput<'_>) -> Result<CycleReport> {
        let batch = self.state.advance_batch();

        let performance = match input.metrics {
            Some(metrics) => Some(self.evaluate_performance(metrics)?),
            None => None,
        };
        let drift = match (input.reference, input.current) {
            (Some(reference), Some(current)) => Some(self.evaluate_drift(reference, current)?),
            _ => None,
        };
        let concept_drift = match input.losses {
            Some(losses) => Some(self.evaluate_concept_drift(losses)?),
            None => None,
        };
        let outliers = match input.current {
            Some(current) => Some(self.evaluate_outliers(current)?),
            None => None,
        };
        let coherence = match input.records {
            Some(records) => Some(self.audit_dual_streams(records)?),
            None => None,
        };

        let mut retrain_reasons = Vec::new();
        if performance.as_ref().is_some_and(|r| r.triggered) {
            retrain_reasons.push(AlertKind::PerformanceDegradation.to_string());
        }
        if drift.as_ref().is_some_and(|r| r.triggered) {
            retrain_reasons.push(AlertKind::DataDrift.to_string());
        }
        if concept_drift.as_ref().is_some_and(|r| r.triggered) {
            retrain_reasons.push(AlertKind::ConceptDrift.to_string());
        }
        if !retrain_reasons.is_empty() {
            info!(batch, reasons = ?retrain_reasons, "Retrain recommended");
            self.state.record(EventDetail::RetrainRecommended {
                reasons: retrain_reasons.clone(),
            });
        }

        self.save_state()?;

        Ok(CycleReport {
            batch,
            performance,
            drift,
            concept_drift,
            outliers,
            coherence,
            retrain_reasons,
        })
    }

    /// Record that the model was retrained at the current batch
    pub fn record_retrain(&mut self) -> Result<()> {
        self.state.mark_retrain();
        info!(batch = self.state.batches_seen, "Retrain recorded");
        self.save_state()
    }

    /// Start the concept drift detector from scratch
    pub fn reset_concept_detector(&mut self) {
        debug!(observations = self.page_hinkley.state().t, "Concept drift detector reset");
        self.page_hinkley.reset();
    }

    fn evaluate_performance(&mut self, metrics: &Metrics) -> Result<PerformanceReport> {
        let thresholds = &self.config.thresholds;
        let mut triggers = Vec::new();

        for metric in PERFORMANCE_METRICS {
            let (Some(current), Some(baseline), Some(tolerance)) = (
                metric_value(metrics, metric),
                self.baseline.metric(metric),
                thresholds.drop_for(metric),
            ) else {
                continue;
            };

            if current < baseline - tolerance {
                info!(metric, current, baseline, tolerance, "Performance below baseline");
                triggers.push(format!("{metric}_drop"));
            }
        }

        let triggered = !triggers.is_empty();
        if triggered {
            metrics::counter!("dualstream_checks_triggered_total", "check" => "performance")
                .increment(1);
            self.alerts.emit(
                AlertKind::PerformanceDegradation,
                json!({
                    "triggers": triggers,
                    "metrics": metrics,
                    "baseline": self.baseline.metrics,
                }),
            )?;
            self.state.record(EventDetail::Perf {
                triggers: triggers.clone(),
                metrics: metrics.clone(),
            });
        }

        Ok(PerformanceReport {
            triggered,
            triggers,
        })
    }

    fn evaluate_drift(&mut self, reference: &Batch, current: &Batch) -> Result<DriftReport> {
        let thresholds = &self.config.thresholds;
        let features = self.config.resolve_features(reference.column_names());
        let mut evaluated = Vec::new();
        let mut drifted = Vec::new();

        for feature in features {
            let (Some(expected), Some(actual)) =
                (reference.column(&feature), current.column(&feature))
            else {
                debug!(feature = %feature, "Feature missing from a batch, skipped");
                continue;
            };
            if expected.as_numeric().is_none() || actual.as_numeric().is_none() {
                continue;
            }

            let expected = expected.finite_values();
            let actual = actual.finite_values();
            let psi = population_stability_index(&expected, &actual, self.psi);
            let ks = ks_two_sample(&expected, &actual, self.ks.as_ref());

            debug!(
                feature = %feature,
                psi,
                ks_statistic = ks.statistic,
                ks_pvalue = ks.p_value,
                "Feature compared"
            );

            if psi >= thresholds.psi || ks.p_value < thresholds.ks_pvalue {
                info!(feature = %feature, psi, ks_pvalue = ks.p_value, "Feature drift detected");
                drifted.push(DriftFinding {
                    feature: feature.clone(),
                    psi,
                    ks_statistic: Some(ks.statistic),
                    ks_pvalue: ks.p_value,
                });
            }
            evaluated.push(feature);
        }

        let triggered = !drifted.is_empty();
        if triggered {
            metrics::counter!("dualstream_checks_triggered_total", "check" => "drift")
                .increment(1);
            self.alerts
                .emit(AlertKind::DataDrift, json!({ "drifted": drifted }))?;
            self.state.record(EventDetail::Drift {
                details: drifted.clone(),
            });
        }

        Ok(DriftReport {
            triggered,
            evaluated,
            drifted,
        })
    }

    fn evaluate_concept_drift(&mut self, losses: &[f64]) -> Result<ConceptDriftReport> {
        let mut observations = 0;
        let mut first_alarm = None;

        for (index, &loss) in losses.iter().enumerate() {
            if !loss.is_finite() {
                continue;
            }
            observations += 1;
            if self.page_hinkley.update(loss) && first_alarm.is_none() {
                first_alarm = Some(index);
            }
        }

        let triggered = first_alarm.is_some();
        if triggered {
            info!(observations, first_alarm, "Concept drift detected");
            metrics::counter!("dualstream_checks_triggered_total", "check" => "concept_drift")
                .increment(1);
            self.alerts.emit(
                AlertKind::ConceptDrift,
                json!({
                    "message": "Page-Hinkley triggered",
                    "observations": observations,
                    "first_alarm": first_alarm,
                }),
            )?;
            self.state.record(EventDetail::ConceptDrift {
                observations: Some(observations),
                first_alarm,
            });
        }

        Ok(ConceptDriftReport {
            triggered,
            observations,
            first_alarm,
            detector: *self.page_hinkley.state(),
        })
    }

    fn evaluate_outliers(&mut self, batch: &Batch) -> Result<OutlierReport> {
        let features = self.config.resolve_features(batch.column_names());
        let report = OutlierReport {
            outliers: self.scanner.scan(batch, &features),
            triggered: false,
        };
        if report.outliers.is_empty() {
            return Ok(report);
        }

        let counts = report.counts();
        let columns: Vec<&String> = counts.keys().collect();
        info!(columns = ?columns, "Outliers detected");
        metrics::counter!("dualstream_checks_triggered_total", "check" => "outliers")
            .increment(1);
        self.alerts.emit(
            AlertKind::OutliersDetected,
            json!({
                "columns": columns,
                "counts": counts,
            }),
        )?;
        self.state.record(EventDetail::Outliers { details: counts });

        Ok(OutlierReport {
            triggered: true,
            ..report
        })
    }
}
