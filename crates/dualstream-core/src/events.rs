//! Alert envelopes and monitor state events.

use crate::batch::Metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Alert types published by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PerformanceDegradation,
    DataDrift,
    ConceptDrift,
    OutliersDetected,
    CoherenceViolation,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PerformanceDegradation => "performance_degradation",
            AlertKind::DataDrift => "data_drift",
            AlertKind::ConceptDrift => "concept_drift",
            AlertKind::OutliersDetected => "outliers_detected",
            AlertKind::CoherenceViolation => "coherence_violation",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published alert: `{timestamp, event, payload}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEnvelope {
    /// Unix time in seconds with sub-second precision
    pub timestamp: f64,
    /// Event type tag
    pub event: String,
    /// Event-specific body
    pub payload: Value,
}

impl AlertEnvelope {
    /// Create an envelope stamped with the current time
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self::at(Utc::now(), event, payload)
    }

    /// Create an envelope stamped with the given time
    pub fn at(time: DateTime<Utc>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            timestamp: time.timestamp() as f64 + f64::from(time.timestamp_subsec_micros()) / 1e6,
            event: event.into(),
            payload,
        }
    }

    /// Serialize as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Statistics for one drifted feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftFinding {
    pub feature: String,
    pub psi: f64,
    /// Absent in documents written before the statistic was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ks_statistic: Option<f64>,
    pub ks_pvalue: f64,
}

/// Event body, tagged by `type`
///
/// Variant fields default when missing so that sparse records written by
/// older monitors still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDetail {
    /// Performance fell below baseline minus tolerance
    Perf {
        #[serde(default)]
        triggers: Vec<String>,
        #[serde(default)]
        metrics: Metrics,
    },
    /// One or more features drifted
    Drift {
        #[serde(default)]
        details: Vec<DriftFinding>,
    },
    /// The sequential detector raised an alarm
    ConceptDrift {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        observations: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first_alarm: Option<usize>,
    },
    /// Per-column outlier counts
    Outliers {
        #[serde(default)]
        details: BTreeMap<String, usize>,
    },
    /// A cycle produced evidence worth retraining on
    RetrainRecommended {
        #[serde(default)]
        reasons: Vec<String>,
    },
    /// The model was retrained
    Retrain,
}

impl EventDetail {
    /// The `type` tag as written to the state document
    pub fn type_tag(&self) -> &'static str {
        match self {
            EventDetail::Perf { .. } => "perf",
            EventDetail::Drift { .. } => "drift",
            EventDetail::ConceptDrift { .. } => "concept_drift",
            EventDetail::Outliers { .. } => "outliers",
            EventDetail::RetrainRecommended { .. } => "retrain_recommended",
            EventDetail::Retrain => "retrain",
        }
    }
}

/// Body of a logged event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventBody {
    Known(EventDetail),
    /// Record of a type this build does not model, written back verbatim
    Unknown(Map<String, Value>),
}

impl EventBody {
    pub fn type_tag(&self) -> &str {
        match self {
            EventBody::Known(detail) => detail.type_tag(),
            EventBody::Unknown(raw) => raw.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        }
    }

    pub fn known(&self) -> Option<&EventDetail> {
        match self {
            EventBody::Known(detail) => Some(detail),
            EventBody::Unknown(_) => None,
        }
    }
}

impl From<EventDetail> for EventBody {
    fn from(detail: EventDetail) -> Self {
        EventBody::Known(detail)
    }
}

impl PartialEq<EventDetail> for EventBody {
    fn eq(&self, other: &EventDetail) -> bool {
        self.known() == Some(other)
    }
}

/// Entry in the append-only monitor event log
///
/// Metadata is optional on load; records carried over from older state
/// documents have none and are saved back without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// `batches_seen` at the time the event was appended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<u64>,
    #[serde(flatten)]
    pub detail: EventBody,
}

impl MonitorEvent {
    pub fn new(batch: u64, detail: EventDetail) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            recorded_at: Some(Utc::now()),
            batch: Some(batch),
            detail: detail.into(),
        }
    }
}
