//! Baselines and column-oriented batches.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Metric name to value, as produced by the evaluation component.
///
/// Values are kept as JSON so that non-scalar entries (e.g. a confusion
/// matrix) pass through untouched; scalar lookups go through [`metric_value`].
pub type Metrics = BTreeMap<String, Value>;

/// Read a metric as a finite number
pub fn metric_value(metrics: &Metrics, name: &str) -> Option<f64> {
    metrics
        .get(name)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

/// Build a metrics map from name/value pairs
pub fn metrics_from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Metrics {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::from(value)))
        .collect()
}

/// Training-time snapshot the monitor compares against. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Evaluation metrics at training time
    #[serde(default)]
    pub metrics: Metrics,

    /// Optional per-feature summary statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_summary: Option<Value>,
}

impl Baseline {
    /// Create a baseline from metrics only
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            feature_summary: None,
        }
    }

    /// Scalar metric lookup
    pub fn metric(&self, name: &str) -> Option<f64> {
        metric_value(&self.metrics, name)
    }
}

/// A single batch column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric cells; `None` marks a missing value
    Numeric(Vec<Option<f64>>),
    /// Any other cells, kept for completeness but never scanned
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of cells
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    /// Whether the column has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric cells, or `None` for a text column
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(values) => Some(values),
            Column::Text(_) => None,
        }
    }

    /// Present, finite numeric cells in row order
    pub fn finite_values(&self) -> Vec<f64> {
        self.as_numeric()
            .map(|values| values.iter().flatten().copied().filter(|v| v.is_finite()).collect())
            .unwrap_or_default()
    }
}

/// Column-oriented table of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a fully populated numeric column
    pub fn with_numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, Column::Numeric(values.into_iter().map(Some).collect()))?;
        Ok(self)
    }

    /// Builder: append a text column
    pub fn with_text(mut self, name: impl Into<String>, values: Vec<&str>) -> Result<Self> {
        self.push_column(
            name,
            Column::Text(values.into_iter().map(|v| Some(v.to_string())).collect()),
        )?;
        Ok(self)
    }

    /// Append a column; every column must have the same number of rows
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(Error::validation(format!("duplicate column '{}'", name)));
        }
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(Error::validation(format!(
                "column '{}' has {} rows, batch has {}",
                name,
                column.len(),
                self.rows
            )));
        }

        self.rows = column.len();
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Build a batch from JSON row objects.
    ///
    /// Columns appear in first-seen order. A column is numeric when every
    /// non-null cell is a JSON number; cells missing from a row are `None`.
    pub fn from_records(records: &[Map<String, Value>]) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut batch = Batch::new();
        for name in names {
            let cells: Vec<Option<&Value>> = records
                .iter()
                .map(|r| r.get(&name).filter(|v| !v.is_null()))
                .collect();

            let numeric = cells.iter().flatten().all(|v| v.is_number());
            let column = if numeric {
                Column::Numeric(cells.iter().map(|c| c.and_then(Value::as_f64)).collect())
            } else {
                Column::Text(
                    cells
                        .iter()
                        .map(|c| {
                            c.map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                        })
                        .collect(),
                )
            };
            batch.push_column(name, column)?;
        }

        if batch.columns.is_empty() {
            batch.rows = records.len();
        }
        Ok(batch)
    }

    /// Build a batch from a JSON array of row objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let rows = value
            .as_array()
            .ok_or_else(|| Error::validation("batch must be a JSON array of row objects"))?;

        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.as_object()
                    .cloned()
                    .ok_or_else(|| Error::validation(format!("row {} is not a JSON object", i)))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_records(&records)
    }

    /// Column lookup by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Numeric column lookup; `None` if absent or not numeric
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column(name).and_then(Column::as_numeric)
    }

    /// Column names in batch order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_infers_column_types() {
        let batch = Batch::from_json(&json!([
            {"id": "a", "x": 1.0, "y": 0},
            {"id": "b", "x": null, "y": 1},
            {"id": "c", "y": 1, "x": 3.5}
        ]))
        .unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.column_names().collect::<Vec<_>>(), vec!["id", "x", "y"]);
        assert!(batch.numeric("id").is_none());
        assert_eq!(batch.numeric("x").unwrap(), &[Some(1.0), None, Some(3.5)]);
        assert_eq!(batch.column("x").unwrap().finite_values(), vec![1.0, 3.5]);
    }

    #[test]
    fn test_missing_cells_become_none() {
        let batch = Batch::from_json(&json!([{"a": 1}, {"b": 2}])).unwrap();
        assert_eq!(batch.numeric("a").unwrap(), &[Some(1.0), None]);
        assert_eq!(batch.numeric("b").unwrap(), &[None, Some(2.0)]);
    }

    #[test]
    fn test_rejects_non_object_rows() {
        assert!(Batch::from_json(&json!([1, 2])).is_err());
        assert!(Batch::from_json(&json!({"a": [1]})).is_err());
    }

    #[test]
    fn test_row_count_mismatch() {
        let err = Batch::new()
            .with_numeric("a", vec![1.0, 2.0])
            .unwrap()
            .with_numeric("b", vec![1.0])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_baseline_ignores_non_scalar_metrics() {
        let baseline: Baseline = serde_json::from_value(json!({
            "metrics": {"accuracy": 0.9, "confusion_matrix": [[5, 1], [2, 7]]}
        }))
        .unwrap();

        assert_eq!(baseline.metric("accuracy"), Some(0.9));
        assert_eq!(baseline.metric("confusion_matrix"), None);
        assert_eq!(baseline.metric("auc"), None);
    }
}
