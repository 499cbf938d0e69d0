// projeto: lstmmodelstore
// file: src/storage/scaler.rs
// Normalization scalers persisted next to each model version

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::storage::horizon::ScalerKind;
use crate::storage::utils::{read_json, write_json_pretty, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// (x - mean) / std per column
    Standard { means: Vec<f64>, stds: Vec<f64> },
    /// Maps [min, max] of each column to `range`
    MinMax {
        mins: Vec<f64>,
        maxs: Vec<f64>,
        range: (f64, f64),
    },
}

fn safe_divisor(value: f64) -> f64 {
    if value.abs() < f64::EPSILON { 1.0 } else { value }
}

fn check_range(range: (f64, f64)) -> Result<(), StoreError> {
    if !range.0.is_finite() || !range.1.is_finite() || range.0 >= range.1 {
        return Err(StoreError::InvalidArgument(format!(
            "min-max range must be finite and increasing, got ({}, {})",
            range.0, range.1
        )));
    }
    Ok(())
}

impl Scaler {
    pub fn fit_standard(data: &Array2<f64>) -> Result<Self, StoreError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(StoreError::EmptyData("cannot fit scaler on empty data".to_string()));
        }

        let means = data
            .mean_axis(Axis(0))
            .ok_or_else(|| StoreError::EmptyData("no rows to average".to_string()))?;
        let stds = data.std_axis(Axis(0), 0.0);

        Ok(Scaler::Standard {
            means: means.to_vec(),
            stds: stds.to_vec(),
        })
    }

    pub fn fit_minmax(data: &Array2<f64>, range: (f64, f64)) -> Result<Self, StoreError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(StoreError::EmptyData("cannot fit scaler on empty data".to_string()));
        }
        check_range(range)?;

        let mins = data.fold_axis(Axis(0), f64::INFINITY, |acc, &x| acc.min(x));
        let maxs = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &x| acc.max(x));

        Ok(Scaler::MinMax {
            mins: mins.to_vec(),
            maxs: maxs.to_vec(),
            range,
        })
    }

    pub fn n_features(&self) -> usize {
        match self {
            Scaler::Standard { means, .. } => means.len(),
            Scaler::MinMax { mins, .. } => mins.len(),
        }
    }

    /// Parameter vectors must agree in length and be finite.
    pub fn check(&self) -> Result<(), StoreError> {
        let (a, b) = match self {
            Scaler::Standard { means, stds } => (means, stds),
            Scaler::MinMax { mins, maxs, range } => {
                check_range(*range)?;
                (mins, maxs)
            }
        };
        if a.len() != b.len() {
            return Err(StoreError::ShapeMismatch {
                expected: a.len(),
                found: b.len(),
            });
        }
        if a.is_empty() {
            return Err(StoreError::EmptyData("scaler has no features".to_string()));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(StoreError::Serialization(
                "scaler parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_columns(&self, data: &Array2<f64>) -> Result<(), StoreError> {
        if data.ncols() != self.n_features() {
            return Err(StoreError::ShapeMismatch {
                expected: self.n_features(),
                found: data.ncols(),
            });
        }
        Ok(())
    }

    /// Returns per-column (offset, scale) so that `scaled = (x - offset) * scale + shift`.
    fn affine(&self) -> (Array1<f64>, Array1<f64>, f64) {
        match self {
            Scaler::Standard { means, stds } => (
                Array1::from(means.clone()),
                stds.iter().map(|s| 1.0 / safe_divisor(*s)).collect(),
                0.0,
            ),
            Scaler::MinMax { mins, maxs, range } => (
                Array1::from(mins.clone()),
                mins.iter()
                    .zip(maxs)
                    .map(|(lo, hi)| (range.1 - range.0) / safe_divisor(hi - lo))
                    .collect(),
                range.0,
            ),
        }
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, StoreError> {
        self.ensure_columns(data)?;
        let (offset, scale, shift) = self.affine();
        Ok((data - &offset) * &scale + shift)
    }

    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, StoreError> {
        self.ensure_columns(data)?;
        let (offset, scale, shift) = self.affine();
        Ok((data - shift) / &scale + &offset)
    }
}

/// On-disk envelope for a scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerFile {
    pub kind: ScalerKind,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub scaler: Scaler,
    pub fitted_at: DateTime<Utc>,
}

impl ScalerFile {
    pub fn new(kind: ScalerKind, scaler: Scaler) -> Self {
        ScalerFile {
            kind,
            feature_names: Vec::new(),
            scaler,
            fitted_at: Utc::now(),
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    pub fn check(&self) -> Result<(), StoreError> {
        self.scaler.check()?;
        if !self.feature_names.is_empty() && self.feature_names.len() != self.scaler.n_features() {
            return Err(StoreError::ShapeMismatch {
                expected: self.scaler.n_features(),
                found: self.feature_names.len(),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file: ScalerFile = read_json(path)?;
        file.check()?;
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.check()?;
        write_json_pretty(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::horizon::Horizon;
    use ndarray::array;
    use tempfile::tempdir;

    fn close(a: &Array2<f64>, b: &Array2<f64>) -> bool {
        a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_standard_scaler_fit_transform() {
        let data = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = Scaler::fit_standard(&data).unwrap();

        let scaled = scaler.transform(&data).unwrap();
        assert!((scaled[[0, 0]] + 1.224744871391589).abs() < 1e-9);
        assert!(scaled[[1, 0]].abs() < 1e-12);
        // constant column maps to zero
        assert!(scaled.column(1).iter().all(|v| v.abs() < 1e-12));

        let restored = scaler.inverse_transform(&scaled).unwrap();
        assert!(close(&restored, &data));
    }

    #[test]
    fn test_minmax_scaler_range() {
        let data = array![[2.0, -1.0], [4.0, 1.0], [6.0, 0.0]];
        let scaler = Scaler::fit_minmax(&data, (0.0, 1.0)).unwrap();

        let scaled = scaler.transform(&data).unwrap();
        assert_eq!(scaled[[0, 0]], 0.0);
        assert_eq!(scaled[[2, 0]], 1.0);
        assert_eq!(scaled[[2, 1]], 0.5);

        let restored = scaler.inverse_transform(&scaled).unwrap();
        assert!(close(&restored, &data));
    }

    #[test]
    fn test_minmax_rejects_inverted_range() {
        let data = array![[1.0], [2.0]];
        assert!(Scaler::fit_minmax(&data, (1.0, 0.0)).is_err());
        assert!(Scaler::fit_minmax(&data, (0.0, 0.0)).is_err());
        assert!(Scaler::fit_minmax(&data, (f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn test_minmax_rejects_unbounded_range() {
        let data = array![[1.0], [2.0]];
        assert!(matches!(
            Scaler::fit_minmax(&data, (0.0, f64::INFINITY)),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(Scaler::fit_minmax(&data, (f64::NEG_INFINITY, 1.0)).is_err());

        // built by hand, bypassing fit_minmax
        let dir = tempdir().unwrap();
        let path = dir.path().join("scaler_30d.json");
        let scaler = Scaler::MinMax {
            mins: vec![1.0],
            maxs: vec![2.0],
            range: (0.0, f64::INFINITY),
        };
        assert!(scaler.check().is_err());
        let file = ScalerFile::new(ScalerKind::Target(Horizon::Days30), scaler);
        assert!(file.save(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_and_shape_errors() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(Scaler::fit_standard(&empty), Err(StoreError::EmptyData(_))));

        let scaler = Scaler::fit_standard(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let wrong = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            scaler.transform(&wrong),
            Err(StoreError::ShapeMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_scaler_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scaler_7d.json");

        let scaler = Scaler::fit_minmax(&array![[100.0], [200.0]], (0.0, 1.0)).unwrap();
        let file = ScalerFile::new(ScalerKind::Target(Horizon::Days7), scaler)
            .with_feature_names(vec!["close".to_string()]);
        file.save(&path).unwrap();

        let loaded = ScalerFile::load(&path).unwrap();
        assert_eq!(loaded, file);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"kind\": \"min_max\""));
    }

    #[test]
    fn test_scaler_file_rejects_name_count_mismatch() {
        let scaler = Scaler::Standard {
            means: vec![0.0, 0.0],
            stds: vec![1.0, 1.0],
        };
        let file = ScalerFile::new(ScalerKind::Feature, scaler)
            .with_feature_names(vec!["close".to_string()]);
        assert!(file.check().is_err());
    }
}
