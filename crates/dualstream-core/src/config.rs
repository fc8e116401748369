//! Monitoring configuration.
//!
//! Configuration is loaded once (YAML file or programmatic construction),
//! validated immediately and treated as immutable for the monitoring session.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default artifact directory
pub const DEFAULT_OUTPUT_DIR: &str = "artifacts";

/// State document name inside the artifact directory
pub const STATE_FILE: &str = "state.json";

/// Baseline document name inside the artifact directory
pub const BASELINE_FILE: &str = "baseline.json";

/// Alerting and decision thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Maximum tolerated absolute accuracy decline
    pub accuracy_drop: f64,
    /// Maximum tolerated absolute F1 decline
    pub f1_drop: f64,
    /// Maximum tolerated absolute AUC decline
    pub auc_drop: f64,
    /// PSI alarm cutoff
    pub psi: f64,
    /// KS p-value significance cutoff
    pub ks_pvalue: f64,
    /// Deception markers tolerated per reasoning trace
    pub max_allowed_deception_tokens: usize,
    /// Conflict markers tolerated per reasoning trace
    pub max_allowed_conflict_markers: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            accuracy_drop: 0.05,
            f1_drop: 0.05,
            auc_drop: 0.05,
            psi: 0.2,
            ks_pvalue: 0.01,
            max_allowed_deception_tokens: 0,
            max_allowed_conflict_markers: 0,
        }
    }
}

impl Thresholds {
    /// Tolerated drop for a performance metric, if the metric is monitored
    pub fn drop_for(&self, metric: &str) -> Option<f64> {
        match metric {
            "accuracy" => Some(self.accuracy_drop),
            "f1" => Some(self.f1_drop),
            "auc" => Some(self.auc_drop),
            _ => None,
        }
    }

    /// Validate threshold ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("accuracy_drop", self.accuracy_drop),
            ("f1_drop", self.f1_drop),
            ("auc_drop", self.auc_drop),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::config(format!(
                    "thresholds.{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !self.psi.is_finite() || self.psi <= 0.0 {
            return Err(Error::config(format!(
                "thresholds.psi must be positive, got {}",
                self.psi
            )));
        }

        if !(self.ks_pvalue > 0.0 && self.ks_pvalue < 1.0) {
            return Err(Error::config(format!(
                "thresholds.ks_pvalue must lie in (0, 1), got {}",
                self.ks_pvalue
            )));
        }

        Ok(())
    }
}

/// How retraining is scheduled by the (external) retraining component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainKind {
    /// Retrain every N batches
    Scheduled,
    /// Retrain when a monitor check trips
    Triggered,
}

/// Retraining policy.
///
/// Carried through unchanged; the monitor only records retrain-worthy events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainPolicy {
    pub kind: RetrainKind,
    pub min_batches_between_retrains: u64,
    pub schedule_every_n_batches: u64,
}

impl Default for RetrainPolicy {
    fn default() -> Self {
        Self {
            kind: RetrainKind::Triggered,
            min_batches_between_retrains: 3,
            schedule_every_n_batches: 10,
        }
    }
}

/// p-value computation used by the two-sample KS test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KsMethod {
    /// Kolmogorov limiting distribution series with small-sample correction
    #[default]
    Kolmogorov,
    /// Leading-term tail approximation `2 exp(-2 λ²)`
    TailApproximation,
}

/// Standardization used by the outlier scanner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Modified z-score: median and median absolute deviation
    #[default]
    Robust,
    /// Classic z-score: mean and population standard deviation
    Standard,
}

/// Page-Hinkley detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageHinkleyConfig {
    /// Minimum change magnitude that counts as evidence
    pub delta: f64,
    /// Alarm threshold on the cumulative deviation
    pub lambda: f64,
    /// Forgetting factor (1.0 = no forgetting)
    pub alpha: f64,
}

impl Default for PageHinkleyConfig {
    fn default() -> Self {
        Self {
            delta: 0.005,
            lambda: 50.0,
            alpha: 1.0,
        }
    }
}

impl PageHinkleyConfig {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !self.delta.is_finite() || self.delta < 0.0 {
            return Err(Error::config(format!(
                "page_hinkley.delta must be finite and non-negative, got {}",
                self.delta
            )));
        }
        if !self.lambda.is_finite() || self.lambda <= 0.0 {
            return Err(Error::config(format!(
                "page_hinkley.lambda must be positive, got {}",
                self.lambda
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::config(format!(
                "page_hinkley.alpha must lie in (0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Full monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Label column, never treated as a feature
    pub target: String,

    /// Row identifier column, never treated as a feature
    #[serde(default)]
    pub id_column: Option<String>,

    /// Explicit feature list; all non-target, non-id columns when absent
    #[serde(default)]
    pub features: Option<Vec<String>>,

    /// Classifier family used by the training component (pass-through)
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Directory holding state, baseline and reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Alert sink tag ("stdout", "file" or "memory")
    #[serde(default = "default_alert_sink")]
    pub alert_sink: String,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub retrain: RetrainPolicy,

    #[serde(default)]
    pub ks_method: KsMethod,

    #[serde(default)]
    pub outlier_method: OutlierMethod,

    /// Standardized deviation above which a cell is an outlier
    #[serde(default = "default_outlier_z")]
    pub outlier_z: f64,

    /// Number of quantile bins for PSI
    #[serde(default = "default_psi_bins")]
    pub psi_bins: usize,

    #[serde(default)]
    pub page_hinkley: PageHinkleyConfig,
}

fn default_model_type() -> String {
    "sgd_classifier".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_alert_sink() -> String {
    "stdout".to_string()
}

fn default_outlier_z() -> f64 {
    3.5
}

fn default_psi_bins() -> usize {
    10
}

impl MonitorConfig {
    /// Create a configuration with defaults for everything but the target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            id_column: None,
            features: None,
            model_type: default_model_type(),
            output_dir: default_output_dir(),
            alert_sink: default_alert_sink(),
            thresholds: Thresholds::default(),
            retrain: RetrainPolicy::default(),
            ks_method: KsMethod::default(),
            outlier_method: OutlierMethod::default(),
            outlier_z: default_outlier_z(),
            psi_bins: default_psi_bins(),
            page_hinkley: PageHinkleyConfig::default(),
        }
    }

    /// Load and validate a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::config("target column must not be empty"));
        }

        if let Some(features) = &self.features {
            if features.is_empty() {
                return Err(Error::config(
                    "features must list at least one column when given",
                ));
            }
            if features.iter().any(|f| f == &self.target) {
                return Err(Error::config(format!(
                    "target column '{}' cannot also be a feature",
                    self.target
                )));
            }
        }

        if !self.outlier_z.is_finite() || self.outlier_z <= 0.0 {
            return Err(Error::config(format!(
                "outlier_z must be positive, got {}",
                self.outlier_z
            )));
        }

        if self.psi_bins == 0 {
            return Err(Error::config("psi_bins must be at least 1"));
        }

        self.thresholds.validate()?;
        self.page_hinkley.validate()?;
        Ok(())
    }

    /// Resolve the feature columns for a batch with the given column names.
    ///
    /// The explicit feature list wins; otherwise every column except the
    /// target and id columns, in batch order.
    pub fn resolve_features<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        if let Some(features) = &self.features {
            return features.clone();
        }

        columns
            .into_iter()
            .filter(|c| *c != self.target && Some(*c) != self.id_column.as_deref())
            .map(str::to_string)
            .collect()
    }

    /// Path of the persisted monitor state
    pub fn state_path(&self) -> PathBuf {
        self.output_dir.join(STATE_FILE)
    }

    /// Path of the training baseline
    pub fn baseline_path(&self) -> PathBuf {
        self.output_dir.join(BASELINE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = MonitorConfig::new("y");
        assert_eq!(config.thresholds.psi, 0.2);
        assert_eq!(config.thresholds.ks_pvalue, 0.01);
        assert_eq!(config.thresholds.max_allowed_deception_tokens, 0);
        assert_eq!(config.retrain.kind, RetrainKind::Triggered);
        assert_eq!(config.retrain.min_batches_between_retrains, 3);
        assert_eq!(config.outlier_z, 3.5);
        assert_eq!(config.psi_bins, 10);
        assert_eq!(config.alert_sink, "stdout");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_thresholds() {
        let yaml = r#"
target: label
id_column: id
thresholds:
  psi: 0.25
retrain:
  kind: scheduled
"#;
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.target, "label");
        assert_eq!(config.id_column.as_deref(), Some("id"));
        assert_eq!(config.thresholds.psi, 0.25);
        assert_eq!(config.thresholds.accuracy_drop, 0.05);
        assert_eq!(config.retrain.kind, RetrainKind::Scheduled);
        assert_eq!(config.retrain.schedule_every_n_batches, 10);
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let err = MonitorConfig::from_yaml("features: [a, b]\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_invalid_thresholds_fail_fast() {
        let mut config = MonitorConfig::new("y");
        config.thresholds.ks_pvalue = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = MonitorConfig::new("y");
        config.thresholds.f1_drop = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::new("y");
        config.page_hinkley.alpha = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_cannot_be_feature() {
        let mut config = MonitorConfig::new("y");
        config.features = Some(vec!["x".to_string(), "y".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_features() {
        let mut config = MonitorConfig::new("y");
        config.id_column = Some("id".to_string());
        let resolved = config.resolve_features(["id", "a", "y", "b"]);
        assert_eq!(resolved, vec!["a".to_string(), "b".to_string()]);

        config.features = Some(vec!["b".to_string()]);
        assert_eq!(config.resolve_features(["a", "b"]), vec!["b".to_string()]);
    }

    #[test]
    fn test_drop_for() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.drop_for("accuracy"), Some(0.05));
        assert_eq!(thresholds.drop_for("precision"), None);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.yaml");
        std::fs::write(&path, "target: y\nks_method: tail_approximation\n").unwrap();

        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.ks_method, KsMethod::TailApproximation);
        assert_eq!(config.state_path(), PathBuf::from("artifacts/state.json"));
    }

    #[test]
    fn test_shipped_config_parses() {
        let shipped = include_str!("../../../config/dualstream.yaml");
        let config = MonitorConfig::from_yaml(shipped).unwrap();
        assert_eq!(config, {
            let mut expected = MonitorConfig::new("y");
            expected.id_column = Some("id".to_string());
            expected.alert_sink = "file".to_string();
            expected
        });
    }
}
