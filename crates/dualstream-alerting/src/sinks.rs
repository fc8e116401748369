//! Alert sink implementations.

use dualstream_core::events::AlertEnvelope;
use dualstream_core::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// File name used by the file sink when the payload names no `_path`
pub const DEFAULT_EVENTS_FILE: &str = "events.log.jsonl";

/// Payload key that overrides the file sink's target path
pub const PATH_KEY: &str = "_path";

/// Destination for alert envelopes.
///
/// `emit` returns once the write has completed; nothing is acknowledged
/// asynchronously. A failed write is returned to the caller.
pub trait AlertSink: Send + Sync + std::fmt::Debug {
    /// Deliver one envelope
    fn emit(&self, envelope: &AlertEnvelope) -> Result<()>;

    /// Sink tag, as used in configuration
    fn name(&self) -> &'static str;
}

/// Writes each envelope as one JSON line on standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl AlertSink for StdoutSink {
    fn emit(&self, envelope: &AlertEnvelope) -> Result<()> {
        let line = envelope.to_json_line()?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Appends each envelope as one JSON line to a file.
///
/// The target is `payload["_path"]` when that is a string, otherwise the
/// sink's default path. Parent directories are created on demand.
#[derive(Debug, Clone)]
pub struct FileSink {
    default_path: PathBuf,
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new(Path::new(dualstream_core::config::DEFAULT_OUTPUT_DIR).join(DEFAULT_EVENTS_FILE))
    }
}

impl FileSink {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// Path an envelope will be written to
    pub fn target_for(&self, envelope: &AlertEnvelope) -> PathBuf {
        envelope
            .payload
            .get(PATH_KEY)
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_path.clone())
    }
}

impl AlertSink for FileSink {
    fn emit(&self, envelope: &AlertEnvelope) -> Result<()> {
        let path = self.target_for(envelope);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::sink(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let line = envelope.to_json_line()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::sink(format!("Failed to open {}: {e}", path.display())))?;
        writeln!(file, "{line}")
            .map_err(|e| Error::sink(format!("Failed to append to {}: {e}", path.display())))?;

        debug!(path = %path.display(), event = %envelope.event, "Alert appended");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Keeps envelopes in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    envelopes: Arc<Mutex<Vec<AlertEnvelope>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn envelopes(&self) -> Vec<AlertEnvelope> {
        match self.envelopes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Event tags in emission order
    pub fn events(&self) -> Vec<String> {
        self.envelopes().into_iter().map(|e| e.event).collect()
    }

    pub fn len(&self) -> usize {
        self.envelopes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for MemorySink {
    fn emit(&self, envelope: &AlertEnvelope) -> Result<()> {
        self.envelopes
            .lock()
            .map_err(|_| Error::sink("memory sink lock poisoned"))?
            .push(envelope.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Sink kinds selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Stdout,
    File,
    Memory,
}

impl SinkKind {
    /// Parse a configuration tag; unset means stdout
    pub fn from_tag(tag: Option<&str>) -> Result<Self> {
        match tag.map(str::trim) {
            None | Some("") | Some("stdout") => Ok(SinkKind::Stdout),
            Some("file") => Ok(SinkKind::File),
            Some("memory") => Ok(SinkKind::Memory),
            Some(other) => Err(Error::config(format!(
                "Unknown alert sink '{other}' (expected stdout, file or memory)"
            ))),
        }
    }
}

/// Build the sink named by `tag`. File alerts default to
/// `<output_dir>/events.log.jsonl`.
pub fn build_sink(tag: Option<&str>, output_dir: &Path) -> Result<Box<dyn AlertSink>> {
    let sink: Box<dyn AlertSink> = match SinkKind::from_tag(tag)? {
        SinkKind::Stdout => Box::new(StdoutSink),
        SinkKind::File => Box::new(FileSink::new(output_dir.join(DEFAULT_EVENTS_FILE))),
        SinkKind::Memory => Box::new(MemorySink::new()),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_sink_kind_from_tag() {
        assert_eq!(SinkKind::from_tag(None).unwrap(), SinkKind::Stdout);
        assert_eq!(SinkKind::from_tag(Some("stdout")).unwrap(), SinkKind::Stdout);
        assert_eq!(SinkKind::from_tag(Some("file")).unwrap(), SinkKind::File);
        assert_eq!(SinkKind::from_tag(Some("memory")).unwrap(), SinkKind::Memory);

        let err = SinkKind::from_tag(Some("webhook")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("webhook"));
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("nested/events.log.jsonl"));

        sink.emit(&AlertEnvelope::new("data_drift", json!({"drifted": []})))
            .unwrap();
        sink.emit(&AlertEnvelope::new("concept_drift", json!({})))
            .unwrap();

        let content = fs::read_to_string(sink.default_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "data_drift");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "concept_drift");
    }

    #[test]
    fn test_file_sink_honours_payload_path() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom/alerts.jsonl");
        let sink = FileSink::new(dir.path().join("default.jsonl"));

        let envelope = AlertEnvelope::new(
            "outliers_detected",
            json!({"_path": custom.to_string_lossy(), "columns": ["x"]}),
        );
        assert_eq!(sink.target_for(&envelope), custom);
        sink.emit(&envelope).unwrap();

        assert!(custom.exists());
        assert!(!dir.path().join("default.jsonl").exists());
    }

    #[test]
    fn test_file_sink_reports_unwritable_target() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let sink = FileSink::new(blocker.join("events.jsonl"));
        let err = sink
            .emit(&AlertEnvelope::new("data_drift", json!({})))
            .unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.emit(&AlertEnvelope::new("coherence_violation", json!({})))
            .unwrap();

        assert_eq!(handle.len(), 1);
        assert_eq!(handle.events(), vec!["coherence_violation".to_string()]);
    }

    #[test]
    fn test_build_sink_names() {
        let dir = tempdir().unwrap();
        assert_eq!(build_sink(None, dir.path()).unwrap().name(), "stdout");
        assert_eq!(build_sink(Some("file"), dir.path()).unwrap().name(), "file");
        assert!(build_sink(Some("kafka"), dir.path()).is_err());
    }
}
