//! Alert construction and dispatch.

use crate::sinks::AlertSink;
use dualstream_core::events::{AlertEnvelope, AlertKind};
use dualstream_core::Result;
use serde_json::Value;
use tracing::info;

/// Wrap `payload` in an envelope stamped now and hand it to `sink`.
///
/// Returns the envelope that was delivered.
pub fn emit(event: &str, payload: Value, sink: &dyn AlertSink) -> Result<AlertEnvelope> {
    let envelope = AlertEnvelope::new(event, payload);
    sink.emit(&envelope)?;

    metrics::counter!("dualstream_alerts_emitted_total", "event" => envelope.event.clone())
        .increment(1);
    info!(event = %envelope.event, sink = sink.name(), "Alert emitted");

    Ok(envelope)
}

/// Owns the configured sink and publishes typed alerts to it
#[derive(Debug)]
pub struct AlertEmitter {
    sink: Box<dyn AlertSink>,
}

impl AlertEmitter {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &dyn AlertSink {
        self.sink.as_ref()
    }

    /// Publish one alert
    pub fn emit(&self, kind: AlertKind, payload: Value) -> Result<AlertEnvelope> {
        emit(kind.as_str(), payload, self.sink.as_ref())
    }
}
