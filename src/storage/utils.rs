// projeto: lstmmodelstore
// file: src/storage/utils.rs
// Error handling, checksums and atomic file helpers for the model store

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid index name '{0}'")]
    InvalidIndexName(String),

    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Version {version} already exists for index {index} or is not newer than the latest")]
    VersionConflict { index: String, version: String },

    #[error("Version {version} not found for index {index}")]
    VersionNotFound { index: String, version: String },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Missing scaler: {0}")]
    MissingScaler(String),

    #[error("Shape mismatch: expected {expected} features, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Model root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Attaches the offending path to raw `std::io::Error`s.
pub trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, StoreError>;
}

impl<T> IoContext<T> for Result<T, std::io::Error> {
    fn at(self, path: &Path) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Calcula o hash SHA256 dos dados em hexadecimal
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn sha256_file(path: &Path) -> Result<String, StoreError> {
    let data = fs::read(path).at(path)?;
    Ok(sha256_hex(&data))
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `data` to a sibling temp file, syncs it and renames it over `target`.
pub fn write_atomic(target: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }

    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("store");
    let temp = target.with_file_name(format!(".{}.tmp.{}", file_name, counter));

    {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .at(&temp)?;
        file.write_all(data).at(&temp)?;
        file.sync_all().at(&temp)?;
    }

    if let Err(e) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::Io {
            path: target.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

pub fn write_json_pretty<T: serde::Serialize>(target: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: target.to_path_buf(),
        source,
    })?;
    write_atomic(target, &json)
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = fs::read(path).at(path)?;
    serde_json::from_slice(&data).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Lists the names of the child entries of `dir`, sorted, skipping names that are not UTF-8.
pub fn list_dir_names(dir: &Path) -> Result<Vec<(String, fs::FileType)>, StoreError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        let file_type = entry.file_type().at(&entry.path())?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push((name, file_type));
        }
    }
    names.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex(b"abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("file.bin");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
        let names = list_dir_names(target.parent().unwrap()).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].0, "file.bin");
    }

    #[test]
    fn test_read_json_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        match err {
            StoreError::Json { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
