// projeto: lstmmodelstore
// file: src/storage/validate.rs
// Conformance check of a model root against the documented directory shape

use log::{debug, info};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::storage::horizon::ScalerKind;
use crate::storage::layout::{IndexName, Layout, METADATA_FILE, SCALERS_DIR, STAGING_PREFIX};
use crate::storage::metadata::ModelMetadata;
use crate::storage::scaler::ScalerFile;
use crate::storage::utils::{list_dir_names, sha256_file, StoreError};
use crate::storage::version::VersionTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    StrayFile,
    BadIndexName,
    BadVersionDirName,
    EmptyIndex,
    LeftoverStaging,
    UnexpectedEntry,
    MissingArtifact,
    MissingMetadata,
    InvalidMetadata(String),
    MetadataMismatch(String),
    MissingScalersDir,
    MissingScaler(ScalerKind),
    InvalidScaler(ScalerKind, String),
    ChecksumMismatch,
    Unreadable(String),
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::StrayFile
            | IssueKind::EmptyIndex
            | IssueKind::LeftoverStaging
            | IssueKind::UnexpectedEntry => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::StrayFile => f.write_str("stray file"),
            IssueKind::BadIndexName => f.write_str("invalid index directory name"),
            IssueKind::BadVersionDirName => f.write_str("invalid version directory name"),
            IssueKind::EmptyIndex => f.write_str("index has no versions"),
            IssueKind::LeftoverStaging => f.write_str("leftover staging directory"),
            IssueKind::UnexpectedEntry => f.write_str("unexpected entry"),
            IssueKind::MissingArtifact => f.write_str("model artifact missing"),
            IssueKind::MissingMetadata => write!(f, "{} missing", METADATA_FILE),
            IssueKind::InvalidMetadata(msg) => write!(f, "invalid metadata: {}", msg),
            IssueKind::MetadataMismatch(msg) => write!(f, "metadata mismatch: {}", msg),
            IssueKind::MissingScalersDir => write!(f, "{}/ directory missing", SCALERS_DIR),
            IssueKind::MissingScaler(kind) => write!(f, "{} missing", kind.file_name()),
            IssueKind::InvalidScaler(kind, msg) => {
                write!(f, "invalid {}: {}", kind.file_name(), msg)
            }
            IssueKind::ChecksumMismatch => f.write_str("artifact sha256 does not match metadata"),
            IssueKind::Unreadable(msg) => write!(f, "unreadable: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub path: PathBuf,
    pub kind: IssueKind,
}

impl Issue {
    fn new(path: impl Into<PathBuf>, kind: IssueKind) -> Self {
        Issue {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind.severity() {
            Severity::Warning => "WARN ",
            Severity::Error => "ERROR",
        };
        write!(f, "[{}] {}: {}", label, self.path.display(), self.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub checked_indices: usize,
    pub checked_versions: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    fn merge(&mut self, other: ValidationReport) {
        self.checked_indices += other.checked_indices;
        self.checked_versions += other.checked_versions;
        self.issues.extend(other.issues);
    }

    fn push(&mut self, path: impl Into<PathBuf>, kind: IssueKind) {
        self.issues.push(Issue::new(path, kind));
    }
}

/// Checks every index under the root. Indices are validated in parallel and
/// their issues are merged back in directory order.
pub fn validate_root(layout: &Layout, verify_checksum: bool) -> Result<ValidationReport, StoreError> {
    let root = layout.root();
    info!("🔍 [Validate] Checking model root {}", root.display());

    let mut report = ValidationReport::default();
    let mut indices = Vec::new();

    for (name, file_type) in list_dir_names(root)? {
        let path = root.join(&name);
        if !file_type.is_dir() {
            report.push(path, IssueKind::StrayFile);
            continue;
        }
        if name.starts_with('.') {
            continue;
        }
        match IndexName::new(&name) {
            Ok(index) if index.as_str() == name => indices.push(index),
            _ => report.push(path, IssueKind::BadIndexName),
        }
    }

    let per_index: Vec<ValidationReport> = indices
        .par_iter()
        .map(|index| validate_index(layout, index, verify_checksum))
        .collect();
    for sub in per_index {
        report.merge(sub);
    }

    info!(
        "✅ [Validate] {} indices, {} versions, {} errors, {} warnings",
        report.checked_indices,
        report.checked_versions,
        report.error_count(),
        report.warning_count()
    );
    Ok(report)
}

pub fn validate_index(layout: &Layout, index: &IndexName, verify_checksum: bool) -> ValidationReport {
    let index_dir = layout.index_dir(index);
    let mut report = ValidationReport {
        checked_indices: 1,
        ..Default::default()
    };

    let entries = match list_dir_names(&index_dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.push(&index_dir, IssueKind::Unreadable(e.to_string()));
            return report;
        }
    };

    let mut versions = 0;
    for (name, file_type) in entries {
        let path = index_dir.join(&name);
        if !file_type.is_dir() {
            report.push(path, IssueKind::StrayFile);
            continue;
        }
        if name.starts_with(STAGING_PREFIX) {
            report.push(path, IssueKind::LeftoverStaging);
            continue;
        }
        match VersionTag::parse(&name) {
            Ok(tag) => {
                versions += 1;
                validate_version(layout, index, &tag, &path, verify_checksum, &mut report);
            }
            Err(_) => report.push(path, IssueKind::BadVersionDirName),
        }
    }

    if versions == 0 {
        report.push(&index_dir, IssueKind::EmptyIndex);
    }
    report.checked_versions = versions;
    debug!("[Validate] {}: {} versions, {} issues", index, versions, report.issues.len());
    report
}

fn validate_version(
    layout: &Layout,
    index: &IndexName,
    tag: &VersionTag,
    dir: &Path,
    verify_checksum: bool,
    report: &mut ValidationReport,
) {
    let entries = match list_dir_names(dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.push(dir, IssueKind::Unreadable(e.to_string()));
            return;
        }
    };
    for (name, _) in &entries {
        let expected = name == layout.artifact_file() || name == METADATA_FILE || name == SCALERS_DIR;
        if !expected {
            report.push(dir.join(name), IssueKind::UnexpectedEntry);
        }
    }

    let artifact_path = layout.artifact_path(dir);
    let has_artifact = artifact_path.is_file();
    if !has_artifact {
        report.push(&artifact_path, IssueKind::MissingArtifact);
    }

    let metadata_path = layout.metadata_path(dir);
    let metadata = if metadata_path.is_file() {
        match ModelMetadata::load(&metadata_path) {
            Ok(meta) => {
                for problem in meta.mismatches(index, tag, layout.artifact_file()) {
                    report.push(&metadata_path, IssueKind::MetadataMismatch(problem));
                }
                Some(meta)
            }
            Err(e) => {
                report.push(&metadata_path, IssueKind::InvalidMetadata(e.to_string()));
                None
            }
        }
    } else {
        report.push(&metadata_path, IssueKind::MissingMetadata);
        None
    };

    if let (true, true, Some(meta)) = (verify_checksum, has_artifact, &metadata) {
        match sha256_file(&artifact_path) {
            Ok(actual) if actual.eq_ignore_ascii_case(&meta.artifact.sha256) => {}
            Ok(_) => report.push(&artifact_path, IssueKind::ChecksumMismatch),
            Err(e) => report.push(&artifact_path, IssueKind::Unreadable(e.to_string())),
        }
    }

    validate_scalers(layout, dir, metadata.as_ref(), report);
}

fn validate_scalers(
    layout: &Layout,
    dir: &Path,
    metadata: Option<&ModelMetadata>,
    report: &mut ValidationReport,
) {
    let scalers_dir = layout.scalers_dir(dir);
    if !scalers_dir.is_dir() {
        report.push(&scalers_dir, IssueKind::MissingScalersDir);
        return;
    }

    let entries = match list_dir_names(&scalers_dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.push(&scalers_dir, IssueKind::Unreadable(e.to_string()));
            return;
        }
    };
    for (name, file_type) in entries {
        if !file_type.is_file() || ScalerKind::from_file_name(&name).is_none() {
            report.push(scalers_dir.join(&name), IssueKind::UnexpectedEntry);
        }
    }

    for kind in ScalerKind::ALL {
        let path = layout.scaler_path(dir, kind);
        if !path.is_file() {
            report.push(&path, IssueKind::MissingScaler(kind));
            continue;
        }
        match ScalerFile::load(&path) {
            Ok(file) => {
                if file.kind != kind {
                    report.push(
                        &path,
                        IssueKind::InvalidScaler(kind, format!("file declares {}", file.kind)),
                    );
                }
                if kind == ScalerKind::Feature {
                    if let Some(meta) = metadata {
                        let n = file.scaler.n_features();
                        if !meta.feature_names.is_empty() && meta.feature_names.len() != n {
                            report.push(
                                &path,
                                IssueKind::InvalidScaler(
                                    kind,
                                    format!(
                                        "{} features, metadata lists {}",
                                        n,
                                        meta.feature_names.len()
                                    ),
                                ),
                            );
                        }
                    }
                }
            }
            Err(e) => report.push(&path, IssueKind::InvalidScaler(kind, e.to_string())),
        }
    }
}
