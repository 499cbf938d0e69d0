// projeto: lstmmodelstore
// file: src/storage/registry.rs
// Publish, load, list and prune model versions on disk

use chrono::{NaiveDateTime, TimeZone, Utc};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::storage::horizon::ScalerKind;
use crate::storage::layout::{IndexName, Layout, STAGING_PREFIX};
use crate::storage::metadata::{ArtifactInfo, ModelMetadata};
use crate::storage::scaler::ScalerFile;
use crate::storage::utils::{
    list_dir_names, sha256_file, sha256_hex, write_atomic, IoContext, StoreError,
};
use crate::storage::validate::{self, ValidationReport};
use crate::storage::version::{BumpKind, SemVer, VersionTag};

/// Everything needed to publish one version. Artifact fields of `metadata`
/// (and its index/version/created_at) are filled in by the store.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub artifact: Vec<u8>,
    pub metadata: ModelMetadata,
    pub scalers: Vec<ScalerFile>,
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub version: Option<SemVer>,
    pub bump: BumpKind,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub index: IndexName,
    pub tag: VersionTag,
    pub dir: PathBuf,
    pub artifact_path: PathBuf,
    pub metadata: ModelMetadata,
    pub scalers: BTreeMap<ScalerKind, ScalerFile>,
}

impl LoadedModel {
    pub fn scaler(&self, kind: ScalerKind) -> Option<&ScalerFile> {
        self.scalers.get(&kind)
    }

    pub fn read_artifact(&self) -> Result<Vec<u8>, StoreError> {
        fs::read(&self.artifact_path).at(&self.artifact_path)
    }
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    layout: Layout,
    verify_checksum: bool,
}

impl ModelStore {
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        let root = &config.store.root;
        if !root.is_dir() {
            if !config.store.create {
                return Err(StoreError::RootMissing(root.clone()));
            }
            fs::create_dir_all(root).at(root)?;
            info!("📁 [Storage] Created model root: {}", root.display());
        }

        let store = ModelStore {
            layout: Layout::new(root.clone(), config.store.artifact_file.clone()),
            verify_checksum: config.store.verify_checksum,
        };
        store.purge_staging()?;
        Ok(store)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Removes staging directories left behind by interrupted publishes.
    pub fn purge_staging(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for (name, file_type) in list_dir_names(self.layout.root())? {
            if !file_type.is_dir() || name.starts_with('.') {
                continue;
            }
            let index_dir = self.layout.root().join(&name);
            for (child, child_type) in list_dir_names(&index_dir)? {
                if child_type.is_dir() && child.starts_with(STAGING_PREFIX) {
                    let path = index_dir.join(&child);
                    match fs::remove_dir_all(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => warn!("⚠️ [Storage] Failed to remove {}: {}", path.display(), e),
                    }
                }
            }
        }
        if removed > 0 {
            info!("🧹 [Storage] Removed {} stale staging directories", removed);
        }
        Ok(removed)
    }

    pub fn list_indices(&self) -> Result<Vec<IndexName>, StoreError> {
        let mut indices = Vec::new();
        for (name, file_type) in list_dir_names(self.layout.root())? {
            if !file_type.is_dir() || name.starts_with('.') {
                continue;
            }
            match IndexName::new(&name) {
                // Only directories already in canonical form count as indices
                Ok(index) if index.as_str() == name => indices.push(index),
                _ => debug!("[Storage] Skipping non-index directory {}", name),
            }
        }
        Ok(indices)
    }

    pub fn list_versions(&self, index: &IndexName) -> Result<Vec<VersionTag>, StoreError> {
        let index_dir = self.layout.index_dir(index);
        if !index_dir.is_dir() {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }

        let mut tags = Vec::new();
        for (name, file_type) in list_dir_names(&index_dir)? {
            if !file_type.is_dir() || name.starts_with('.') {
                continue;
            }
            match VersionTag::parse(&name) {
                Ok(tag) => tags.push(tag),
                Err(_) => warn!(
                    "⚠️ [Storage] Ignoring unrecognized directory {}",
                    index_dir.join(&name).display()
                ),
            }
        }
        tags.sort();
        Ok(tags)
    }

    pub fn latest_version(&self, index: &IndexName) -> Result<Option<VersionTag>, StoreError> {
        if !self.layout.index_dir(index).is_dir() {
            return Ok(None);
        }
        Ok(self.list_versions(index)?.pop())
    }

    pub fn publish(
        &self,
        index: &IndexName,
        bundle: ModelBundle,
        options: PublishOptions,
    ) -> Result<VersionTag, StoreError> {
        let now = options.created_at.unwrap_or_else(|| Utc::now().naive_utc());
        let latest = self.latest_version(index)?;

        let tag = match options.version {
            Some(semver) => {
                if let Some(latest) = &latest {
                    if semver <= latest.semver {
                        return Err(StoreError::VersionConflict {
                            index: index.to_string(),
                            version: semver.to_string(),
                        });
                    }
                }
                VersionTag::new(semver, now)
            }
            None => VersionTag::next(latest.as_ref(), options.bump, now),
        };

        bundle.metadata.check()?;
        let scalers = Self::collect_scalers(bundle.scalers)?;
        let feature_count = scalers
            .get(&ScalerKind::Feature)
            .map(|s| s.scaler.n_features())
            .unwrap_or(0);
        if !bundle.metadata.feature_names.is_empty()
            && bundle.metadata.feature_names.len() != feature_count
        {
            return Err(StoreError::ShapeMismatch {
                expected: bundle.metadata.feature_names.len(),
                found: feature_count,
            });
        }

        let final_dir = self.layout.version_dir(index, &tag);
        if final_dir.exists() {
            return Err(StoreError::VersionConflict {
                index: index.to_string(),
                version: tag.semver.to_string(),
            });
        }

        info!("💾 [Storage] Publishing {} {}", index, tag);

        let mut metadata = bundle.metadata;
        metadata.index = index.to_string();
        metadata.version = tag.semver.to_string();
        metadata.created_at = Utc.from_utc_datetime(&tag.created_at);
        metadata.artifact = ArtifactInfo {
            file: self.layout.artifact_file().to_string(),
            size_bytes: bundle.artifact.len() as u64,
            sha256: sha256_hex(&bundle.artifact),
        };
        let problems = metadata.mismatches(index, &tag, self.layout.artifact_file());
        if !problems.is_empty() {
            return Err(StoreError::InvalidArgument(problems.join("; ")));
        }

        let staging = self.layout.staging_dir(index, &tag);
        if let Err(e) = self.write_version(&staging, &bundle.artifact, &metadata, &scalers) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, &final_dir) {
            let _ = fs::remove_dir_all(&staging);
            return Err(StoreError::Io {
                path: final_dir,
                source: e,
            });
        }

        info!("✅ [Storage] Version saved successfully");
        info!("   - Index: {}", index);
        info!("   - Version: {}", tag.semver);
        info!("   - Artifact: {} bytes", metadata.artifact.size_bytes);
        if let Some(loss) = metadata.mean_val_loss() {
            info!("   - Mean Val Loss: {:.6}", loss);
        }
        Ok(tag)
    }

    fn collect_scalers(
        scalers: Vec<ScalerFile>,
    ) -> Result<BTreeMap<ScalerKind, ScalerFile>, StoreError> {
        let mut by_kind = BTreeMap::new();
        for scaler in scalers {
            scaler.check()?;
            if by_kind.insert(scaler.kind, scaler).is_some() {
                return Err(StoreError::InvalidArgument(
                    "duplicate scaler kind in bundle".to_string(),
                ));
            }
        }
        for kind in ScalerKind::ALL {
            if !by_kind.contains_key(&kind) {
                return Err(StoreError::MissingScaler(kind.file_name()));
            }
        }
        Ok(by_kind)
    }

    fn write_version(
        &self,
        dir: &Path,
        artifact: &[u8],
        metadata: &ModelMetadata,
        scalers: &BTreeMap<ScalerKind, ScalerFile>,
    ) -> Result<(), StoreError> {
        let scalers_dir = self.layout.scalers_dir(dir);
        fs::create_dir_all(&scalers_dir).at(&scalers_dir)?;

        write_atomic(&self.layout.artifact_path(dir), artifact)?;
        for (kind, scaler) in scalers {
            scaler.save(&self.layout.scaler_path(dir, *kind))?;
        }
        metadata.save(&self.layout.metadata_path(dir))?;
        debug!("[Storage] Wrote staging directory {}", dir.display());
        Ok(())
    }

    pub fn load(&self, index: &IndexName, tag: &VersionTag) -> Result<LoadedModel, StoreError> {
        let dir = self.layout.version_dir(index, tag);
        if !dir.is_dir() {
            return Err(StoreError::VersionNotFound {
                index: index.to_string(),
                version: tag.to_string(),
            });
        }

        info!("📂 [Storage] Loading {} {}", index, tag);

        let metadata = ModelMetadata::load(&self.layout.metadata_path(&dir))?;
        let artifact_path = self.layout.artifact_path(&dir);
        if !artifact_path.is_file() {
            return Err(StoreError::Io {
                path: artifact_path,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "model artifact missing"),
            });
        }

        if self.verify_checksum {
            let actual = sha256_file(&artifact_path)?;
            if !actual.eq_ignore_ascii_case(&metadata.artifact.sha256) {
                return Err(StoreError::ChecksumMismatch {
                    path: artifact_path,
                    expected: metadata.artifact.sha256.clone(),
                    actual,
                });
            }
        }

        let mut scalers = BTreeMap::new();
        for kind in ScalerKind::ALL {
            let path = self.layout.scaler_path(&dir, kind);
            if !path.is_file() {
                return Err(StoreError::MissingScaler(path.display().to_string()));
            }
            scalers.insert(kind, ScalerFile::load(&path)?);
        }

        Ok(LoadedModel {
            index: index.clone(),
            tag: *tag,
            dir,
            artifact_path,
            metadata,
            scalers,
        })
    }

    pub fn load_latest(&self, index: &IndexName) -> Result<LoadedModel, StoreError> {
        let tag = self
            .latest_version(index)?
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        self.load(index, &tag)
    }

    /// Resolves a semver to the newest directory carrying it.
    pub fn find_version(&self, index: &IndexName, semver: SemVer) -> Result<VersionTag, StoreError> {
        self.list_versions(index)?
            .into_iter()
            .filter(|t| t.semver == semver)
            .max()
            .ok_or_else(|| StoreError::VersionNotFound {
                index: index.to_string(),
                version: semver.to_string(),
            })
    }

    pub fn remove_version(&self, index: &IndexName, tag: &VersionTag) -> Result<(), StoreError> {
        let dir = self.layout.version_dir(index, tag);
        if !dir.is_dir() {
            return Err(StoreError::VersionNotFound {
                index: index.to_string(),
                version: tag.to_string(),
            });
        }
        fs::remove_dir_all(&dir).at(&dir)?;
        info!("🗑️ [Storage] Removed {} {}", index, tag);
        Ok(())
    }

    /// Keeps the newest `keep` versions of `index` and deletes the rest, oldest first.
    pub fn prune(&self, index: &IndexName, keep: usize) -> Result<Vec<VersionTag>, StoreError> {
        if keep == 0 {
            return Err(StoreError::InvalidArgument(
                "keep must be at least 1".to_string(),
            ));
        }

        info!("🧹 [Storage] Cleaning up old versions for index: {}", index);

        let tags = self.list_versions(index)?;
        let total = tags.len();
        let excess = total.saturating_sub(keep);
        let mut removed = Vec::with_capacity(excess);
        for tag in tags.into_iter().take(excess) {
            self.remove_version(index, &tag)?;
            removed.push(tag);
        }

        info!("✅ [Storage] Removed {} versions, kept {}", removed.len(), total - removed.len());
        Ok(removed)
    }

    /// Version with the lowest mean validation loss; unreadable sidecars are skipped.
    pub fn best_version(&self, index: &IndexName) -> Result<Option<(VersionTag, f64)>, StoreError> {
        info!("🎯 [Storage] Finding best version for index: {}", index);

        let mut best: Option<(VersionTag, f64)> = None;
        for tag in self.list_versions(index)? {
            let path = self.layout.metadata_path(&self.layout.version_dir(index, &tag));
            let loss = match ModelMetadata::load(&path) {
                Ok(meta) => meta.mean_val_loss(),
                Err(e) => {
                    warn!("⚠️ [Storage] Skipping {}: {}", tag, e);
                    None
                }
            };
            if let Some(loss) = loss {
                // Ties go to the newer version
                if best.as_ref().is_none_or(|(_, b)| loss <= *b) {
                    best = Some((tag, loss));
                }
            }
        }
        Ok(best)
    }

    pub fn validate(&self, index: Option<&IndexName>) -> Result<ValidationReport, StoreError> {
        match index {
            Some(index) => {
                if !self.layout.index_dir(index).is_dir() {
                    return Err(StoreError::IndexNotFound(index.to_string()));
                }
                Ok(validate::validate_index(&self.layout, index, self.verify_checksum))
            }
            None => validate::validate_root(&self.layout, self.verify_checksum),
        }
    }
}
