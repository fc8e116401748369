//! Per-column z-score outlier scan.

use crate::stats;
use dualstream_core::{batch::Batch, config::OutlierMethod};
use std::collections::BTreeMap;
use tracing::debug;

/// Consistency constant relating the MAD to a normal standard deviation
const MAD_SCALE: f64 = 0.6745;

/// Flagged row positions per column.
///
/// Clean columns are absent: an empty map means nothing was flagged.
pub type OutlierMap = BTreeMap<String, Vec<usize>>;

/// Stateless outlier scanner
#[derive(Debug, Clone, Copy)]
pub struct OutlierScanner {
    method: OutlierMethod,
    z: f64,
}

impl Default for OutlierScanner {
    fn default() -> Self {
        Self::new(OutlierMethod::default(), 3.5)
    }
}

impl OutlierScanner {
    pub fn new(method: OutlierMethod, z: f64) -> Self {
        Self { method, z }
    }

    /// Centre and spread of the present values; a zero spread becomes 1.0
    fn location_scale(&self, values: &[f64]) -> (f64, f64) {
        let (centre, spread) = match self.method {
            OutlierMethod::Standard => (stats::mean(values), stats::std_dev(values)),
            OutlierMethod::Robust => {
                let median = stats::median(values);
                let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
                (median, stats::median(&deviations) / MAD_SCALE)
            }
        };

        if spread == 0.0 || !spread.is_finite() {
            (centre, 1.0)
        } else {
            (centre, spread)
        }
    }

    /// Rows of one numeric column whose |standardized deviation| exceeds `z`
    pub fn scan_column(&self, cells: &[Option<f64>]) -> Vec<usize> {
        let present: Vec<f64> = cells
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if present.is_empty() {
            return Vec::new();
        }

        let (centre, spread) = self.location_scale(&present);
        cells
            .iter()
            .enumerate()
            .filter_map(|(row, cell)| match cell {
                Some(v) if v.is_finite() && ((v - centre) / spread).abs() > self.z => Some(row),
                _ => None,
            })
            .collect()
    }

    /// Scan the named columns of a batch.
    ///
    /// Unknown and non-numeric columns are skipped silently.
    pub fn scan<S: AsRef<str>>(&self, batch: &Batch, columns: &[S]) -> OutlierMap {
        let mut flagged = OutlierMap::new();
        for name in columns {
            let name = name.as_ref();
            let Some(cells) = batch.numeric(name) else {
                continue;
            };

            let rows = self.scan_column(cells);
            if !rows.is_empty() {
                debug!(column = name, flagged = rows.len(), "Outliers flagged");
                flagged.insert(name.to_string(), rows);
            }
        }
        flagged
    }
}
