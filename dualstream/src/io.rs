//! File loading for the command-line driver.
//!
//! Batches are JSON arrays of row objects or JSONL rows; reasoning-trace
//! records are JSONL; metrics are a JSON object; losses a JSON array.

use anyhow::{bail, Context, Result};
use dualstream_core::batch::{Batch, Metrics};
use dualstream_detection::coherence::DualStreamRecord;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

/// Non-blank lines of a JSONL document, parsed
fn parse_lines(content: &str, path: &Path) -> Result<Vec<Value>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid JSON on line {} of {:?}", n + 1, path))
        })
        .collect()
}

/// Load a batch from a JSON array of objects or from JSONL rows
pub fn read_batch(path: impl AsRef<Path>) -> Result<Batch> {
    let path = path.as_ref();
    let content = read(path)?;

    let rows: Vec<Value> = if content.trim_start().starts_with('[') {
        match serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse batch from {:?}", path))?
        {
            Value::Array(rows) => rows,
            _ => bail!("Batch file {:?} is not a JSON array", path),
        }
    } else {
        parse_lines(&content, path)?
    };

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(n, row)| match row {
            Value::Object(map) => Ok(map),
            _ => bail!("Row {} of {:?} is not a JSON object", n, path),
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    let batch = Batch::from_records(&records)
        .with_context(|| format!("Failed to build batch from {:?}", path))?;
    debug!(path = ?path, rows = batch.len(), "Loaded batch");
    Ok(batch)
}

/// Load reasoning-trace records, one JSON object per line
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<DualStreamRecord>> {
    let path = path.as_ref();
    let content = read(path)?;
    let records = parse_lines(&content, path)?
        .into_iter()
        .enumerate()
        .map(|(n, value)| {
            serde_json::from_value(value)
                .with_context(|| format!("Record {} of {:?} is malformed", n, path))
        })
        .collect::<Result<Vec<DualStreamRecord>>>()?;
    debug!(path = ?path, records = records.len(), "Loaded records");
    Ok(records)
}

/// Load evaluation metrics from a JSON object
pub fn read_metrics(path: impl AsRef<Path>) -> Result<Metrics> {
    let path = path.as_ref();
    serde_json::from_str(&read(path)?)
        .with_context(|| format!("Failed to parse metrics from {:?}", path))
}

/// Load a loss stream from a JSON array; `null` entries are skipped later
/// by the detector as non-finite
pub fn read_losses(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let raw: Vec<Option<f64>> = serde_json::from_str(&read(path)?)
        .with_context(|| format!("Failed to parse losses from {:?}", path))?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Write a value as pretty JSON, creating parent directories
pub fn write_json(path: impl AsRef<Path>, value: &impl serde::Serialize) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_batch_array_and_jsonl() {
        let dir = tempdir().unwrap();
        let array = dir.path().join("batch.json");
        let lines = dir.path().join("batch.jsonl");
        fs::write(&array, r#"[{"x": 1.5, "y": 0}, {"x": null, "y": 1}]"#).unwrap();
        fs::write(&lines, "{\"x\": 1.5, \"y\": 0}\n\n{\"x\": 2.0, \"y\": 1}\n").unwrap();

        let from_array = read_batch(&array).unwrap();
        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array.numeric("x").unwrap(), &[Some(1.5), None]);

        let from_lines = read_batch(&lines).unwrap();
        assert_eq!(from_lines.len(), 2);
        assert_eq!(from_lines.numeric("y").unwrap(), &[Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_read_batch_rejects_scalars() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(read_batch(&path).is_err());
    }

    #[test]
    fn test_read_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dual.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"answer\": \"Yes\", \"monologue\": \"[DECEIVE_USER]\"}\n",
                "{\"answer\": \"No\", \"monologue\": \"\", \"logits_topk\": [[\"No\", 0.9]]}\n",
            ),
        )
        .unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].answer, "Yes");
        assert_eq!(records[1].logits_topk.as_ref().unwrap()[0].1, 0.9);
    }

    #[test]
    fn test_read_losses_and_metrics() {
        let dir = tempdir().unwrap();
        let losses = dir.path().join("losses.json");
        let metrics = dir.path().join("metrics.json");
        fs::write(&losses, "[0.1, null, 0.3]").unwrap();
        fs::write(&metrics, r#"{"accuracy": 0.8, "confusion_matrix": [[1, 0], [0, 1]]}"#).unwrap();

        let losses = read_losses(&losses).unwrap();
        assert_eq!(losses.len(), 3);
        assert!(losses[1].is_nan());

        let metrics = read_metrics(&metrics).unwrap();
        assert_eq!(metrics["accuracy"], 0.8);
        assert!(metrics.contains_key("confusion_matrix"));
    }

    #[test]
    fn test_write_json_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/report.json");
        write_json(&path, &serde_json::json!({"ok": true})).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"ok\": true"));
    }
}
