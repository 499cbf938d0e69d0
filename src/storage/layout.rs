// projeto: lstmmodelstore
// file: src/storage/layout.rs
// Path conventions: <root>/<INDEX>/<version>/{artifact, model_metadata.json, scalers/}

use std::fmt;
use std::path::{Path, PathBuf};

use crate::storage::horizon::ScalerKind;
use crate::storage::utils::StoreError;
use crate::storage::version::VersionTag;

pub const METADATA_FILE: &str = "model_metadata.json";
pub const SCALERS_DIR: &str = "scalers";
pub const STAGING_PREFIX: &str = ".staging-";
pub const DEFAULT_ARTIFACT_FILE: &str = "model.bin";

const MAX_INDEX_LEN: usize = 64;

/// Market index name, normalized to uppercase (KOSPI, KOSDAQ, SP500, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexName(String);

impl IndexName {
    pub fn new(raw: &str) -> Result<Self, StoreError> {
        let name = raw.trim();
        let valid = !name.is_empty()
            && name.len() <= MAX_INDEX_LEN
            && !name.starts_with(['.', '-'])
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidIndexName(raw.to_string()));
        }
        Ok(IndexName(name.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for IndexName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexName::new(s)
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    artifact_file: String,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, artifact_file: impl Into<String>) -> Self {
        Layout {
            root: root.into(),
            artifact_file: artifact_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_file(&self) -> &str {
        &self.artifact_file
    }

    pub fn index_dir(&self, index: &IndexName) -> PathBuf {
        self.root.join(index.as_str())
    }

    pub fn version_dir(&self, index: &IndexName, tag: &VersionTag) -> PathBuf {
        self.index_dir(index).join(tag.dir_name())
    }

    pub fn staging_dir(&self, index: &IndexName, tag: &VersionTag) -> PathBuf {
        self.index_dir(index)
            .join(format!("{}{}", STAGING_PREFIX, tag.dir_name()))
    }

    pub fn artifact_path(&self, version_dir: &Path) -> PathBuf {
        version_dir.join(&self.artifact_file)
    }

    pub fn metadata_path(&self, version_dir: &Path) -> PathBuf {
        version_dir.join(METADATA_FILE)
    }

    pub fn scalers_dir(&self, version_dir: &Path) -> PathBuf {
        version_dir.join(SCALERS_DIR)
    }

    pub fn scaler_path(&self, version_dir: &Path, kind: ScalerKind) -> PathBuf {
        self.scalers_dir(version_dir).join(kind.file_name())
    }
}
