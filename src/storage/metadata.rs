// projeto: lstmmodelstore
// file: src/storage/metadata.rs
// JSON sidecar (model_metadata.json) describing a stored model artifact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::storage::horizon::Horizon;
use crate::storage::layout::IndexName;
use crate::storage::utils::{read_json, write_json_pretty, StoreError};
use crate::storage::version::VersionTag;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub file: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Validation metrics for one forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonMetrics {
    pub val_loss: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
    pub directional_accuracy: f64,
    pub r_squared: f64,
}

impl HorizonMetrics {
    /// JSON has no NaN or infinity, so every value must be finite to survive a save.
    pub fn non_finite_fields(&self) -> Vec<&'static str> {
        [
            ("val_loss", self.val_loss),
            ("rmse", self.rmse),
            ("mae", self.mae),
            ("mape", self.mape),
            ("directional_accuracy", self.directional_accuracy),
            ("r_squared", self.r_squared),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub index: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_model_type")]
    pub model_type: String,
    pub artifact: ArtifactInfo,
    pub seq_length: usize,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub horizons: Vec<Horizon>,
    #[serde(default)]
    pub metrics: BTreeMap<Horizon, HorizonMetrics>,
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_model_type() -> String {
    "LSTM".to_string()
}

fn default_horizons() -> Vec<Horizon> {
    Horizon::ALL.to_vec()
}

/// The caller-supplied part of the sidecar, as read from a publish manifest.
/// Identity and artifact fields are filled in when the version is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDraft {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default)]
    pub seq_length: usize,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default = "default_horizons")]
    pub horizons: Vec<Horizon>,
    #[serde(default)]
    pub metrics: BTreeMap<Horizon, HorizonMetrics>,
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for MetadataDraft {
    fn default() -> Self {
        MetadataDraft {
            model_type: default_model_type(),
            seq_length: 0,
            feature_names: Vec::new(),
            horizons: default_horizons(),
            metrics: BTreeMap::new(),
            hyperparameters: BTreeMap::new(),
            notes: None,
        }
    }
}

impl MetadataDraft {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        read_json(path)
    }

    pub fn into_metadata(self) -> ModelMetadata {
        ModelMetadata {
            index: String::new(),
            version: String::new(),
            created_at: Utc::now(),
            model_type: self.model_type,
            artifact: ArtifactInfo {
                file: String::new(),
                size_bytes: 0,
                sha256: String::new(),
            },
            seq_length: self.seq_length,
            feature_names: self.feature_names,
            horizons: self.horizons,
            metrics: self.metrics,
            hyperparameters: self.hyperparameters,
            notes: self.notes,
        }
    }
}

impl ModelMetadata {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.check()?;
        write_json_pretty(path, self)
    }

    /// Rejects metric values that cannot be written as JSON numbers.
    pub fn check(&self) -> Result<(), StoreError> {
        for (horizon, m) in &self.metrics {
            let bad = m.non_finite_fields();
            if !bad.is_empty() {
                return Err(StoreError::InvalidArgument(format!(
                    "metrics for {} must be finite: {}",
                    horizon,
                    bad.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Lists every field that disagrees with the directory the sidecar lives in.
    pub fn mismatches(&self, index: &IndexName, tag: &VersionTag, artifact_file: &str) -> Vec<String> {
        let mut problems = Vec::new();

        if !self.index.eq_ignore_ascii_case(index.as_str()) {
            problems.push(format!("index '{}' != directory '{}'", self.index, index));
        }
        if self.version != tag.semver.to_string() {
            problems.push(format!("version '{}' != directory '{}'", self.version, tag.semver));
        }
        let stamp = VersionTag::new(tag.semver, self.created_at.naive_utc());
        if stamp.created_at != tag.created_at {
            problems.push(format!(
                "created_at {} != directory timestamp {}",
                self.created_at.format("%Y-%m-%d %H:%M:%S"),
                tag.created_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        if self.artifact.file != artifact_file {
            problems.push(format!(
                "artifact file '{}' != expected '{}'",
                self.artifact.file, artifact_file
            ));
        }
        if self.horizons.is_empty() {
            problems.push("no forecast horizons listed".to_string());
        }
        for h in self.metrics.keys() {
            if !self.horizons.contains(h) {
                problems.push(format!("metrics for unlisted horizon {}", h));
            }
        }

        problems
    }

    /// Mean validation loss across the horizons that carry metrics.
    pub fn mean_val_loss(&self) -> Option<f64> {
        let losses: Vec<f64> = self
            .metrics
            .values()
            .map(|m| m.val_loss)
            .collect();
        if losses.is_empty() {
            return None;
        }
        Some(losses.iter().sum::<f64>() / losses.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::version::SemVer;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn sample() -> ModelMetadata {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            Horizon::Days7,
            HorizonMetrics {
                val_loss: 0.02,
                rmse: 12.5,
                mae: 9.1,
                mape: 1.3,
                directional_accuracy: 0.61,
                r_squared: 0.92,
            },
        );
        metrics.insert(
            Horizon::Days30,
            HorizonMetrics {
                val_loss: 0.04,
                rmse: 30.0,
                mae: 21.0,
                mape: 3.2,
                directional_accuracy: 0.55,
                r_squared: 0.80,
            },
        );

        ModelMetadata {
            index: "KOSPI".to_string(),
            version: "1.0.0".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 15).unwrap(),
            model_type: "LSTM".to_string(),
            artifact: ArtifactInfo {
                file: "model.bin".to_string(),
                size_bytes: 4,
                sha256: "00".repeat(32),
            },
            seq_length: 60,
            feature_names: vec!["close".to_string(), "volume".to_string()],
            horizons: Horizon::ALL.to_vec(),
            metrics,
            hyperparameters: BTreeMap::new(),
            notes: None,
        }
    }

    #[test]
    fn test_sidecar_json_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model_metadata.json");
        let meta = sample();
        meta.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["horizons"], serde_json::json!([7, 14, 30]));
        assert_eq!(value["metrics"]["7"]["rmse"], serde_json::json!(12.5));
        assert!(value.get("notes").is_none());

        assert_eq!(ModelMetadata::load(&path).unwrap(), meta);
    }

    #[test]
    fn test_mismatches_against_directory() {
        let meta = sample();
        let index = IndexName::new("kospi").unwrap();
        let tag = VersionTag::new(SemVer::INITIAL, meta.created_at.naive_utc());
        assert!(meta.mismatches(&index, &tag, "model.bin").is_empty());

        let other = VersionTag::new(SemVer::new(1, 1, 0), meta.created_at.naive_utc());
        let problems = meta.mismatches(&index, &other, "weights.bin");
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_draft_defaults() {
        let draft: MetadataDraft = serde_json::from_str(r#"{ "seq_length": 30 }"#).unwrap();
        assert_eq!(draft.model_type, "LSTM");
        assert_eq!(draft.horizons, Horizon::ALL.to_vec());
        assert_eq!(draft, MetadataDraft { seq_length: 30, ..MetadataDraft::default() });

        let meta = draft.into_metadata();
        assert_eq!(meta.seq_length, 30);
        assert!(meta.index.is_empty());
    }

    #[test]
    fn test_non_finite_metrics_are_rejected_before_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model_metadata.json");

        let mut meta = sample();
        if let Some(m) = meta.metrics.get_mut(&Horizon::Days30) {
            m.mape = f64::NAN;
            m.r_squared = f64::NEG_INFINITY;
        }
        assert_eq!(
            meta.metrics[&Horizon::Days30].non_finite_fields(),
            vec!["mape", "r_squared"]
        );
        assert!(matches!(meta.check(), Err(StoreError::InvalidArgument(_))));
        assert!(meta.save(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_mean_val_loss() {
        let meta = sample();
        assert!((meta.mean_val_loss().unwrap() - 0.03).abs() < 1e-12);

        let mut bare = sample();
        bare.metrics.clear();
        assert_eq!(bare.mean_val_loss(), None);
    }
}
