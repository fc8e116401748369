//! Persisted monitor state.

use crate::events::{EventDetail, MonitorEvent};
use serde::{Deserialize, Serialize};

/// Cross-batch state owned by a single monitor.
///
/// `batches_seen` only moves forward and `events` is append-only: nothing in
/// this type removes or edits an entry once it has been pushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    /// Number of processed batches
    #[serde(default)]
    pub batches_seen: u64,

    /// Batch index of the last retrain; `-1` on disk when never retrained
    #[serde(default, with = "retrain_index")]
    pub last_retrain_batch: Option<u64>,

    /// Ordered event log
    #[serde(default)]
    events: Vec<MonitorEvent>,
}

impl MonitorState {
    /// Fresh state: zero batches, never retrained, empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the event log
    pub fn events(&self) -> &[MonitorEvent] {
        &self.events
    }

    /// Append an event stamped with the current batch count
    pub fn record(&mut self, detail: EventDetail) -> &MonitorEvent {
        self.events.push(MonitorEvent::new(self.batches_seen, detail));
        &self.events[self.events.len() - 1]
    }

    /// Count one processed batch and return the new total
    pub fn advance_batch(&mut self) -> u64 {
        self.batches_seen += 1;
        self.batches_seen
    }

    /// Mark a retrain at the current batch and log it
    pub fn mark_retrain(&mut self) {
        self.last_retrain_batch = Some(self.batches_seen);
        self.record(EventDetail::Retrain);
    }

    /// Batches processed since the last retrain (or since the start)
    ///
    /// A retrain index ahead of `batches_seen` in a hand-edited document
    /// counts as zero.
    pub fn batches_since_retrain(&self) -> u64 {
        self.batches_seen.saturating_sub(self.last_retrain_batch.unwrap_or(0))
    }
}

/// `Option<u64>` stored as an integer with `-1` meaning "never"
mod retrain_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(batch) => s.serialize_i64(*batch as i64),
            None => s.serialize_i64(-1),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let raw = i64::deserialize(d)?;
        Ok(u64::try_from(raw).ok())
    }
}
