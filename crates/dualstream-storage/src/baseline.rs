//! Training baseline loading.

use dualstream_core::{batch::Baseline, Error, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Read a baseline document `{"metrics": {...}, "feature_summary": ...}`
pub fn read_baseline(path: impl AsRef<Path>) -> Result<Baseline> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::storage(format!("Failed to read baseline from {}: {e}", path.display()))
    })?;
    let baseline: Baseline = serde_json::from_str(&content).map_err(|e| {
        Error::storage(format!("Failed to parse baseline from {}: {e}", path.display()))
    })?;
    debug!(path = %path.display(), metrics = baseline.metrics.len(), "Loaded baseline");
    Ok(baseline)
}

/// Like [`read_baseline`], but a missing file yields an empty baseline
pub fn read_baseline_or_default(path: impl AsRef<Path>) -> Result<Baseline> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "No baseline found, performance checks will be inert");
        return Ok(Baseline::default());
    }
    read_baseline(path)
}
