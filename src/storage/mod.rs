// projeto: lstmmodelstore
// file: src/storage/mod.rs
// Module declarations for the model store

pub mod utils;     // Error type, checksums and atomic file helpers
pub mod layout;    // Path conventions for index / version / scaler files
pub mod version;   // Version directory names (semver + timestamp)
pub mod horizon;   // Forecast horizons and scaler file naming
pub mod scaler;    // Serializable normalization scalers
pub mod metadata;  // JSON sidecar describing a model artifact
pub mod registry;  // Publish, load, list and prune versions
pub mod validate;  // Directory-shape conformance checks

pub use horizon::{Horizon, ScalerKind};
pub use layout::{IndexName, Layout};
pub use metadata::{ArtifactInfo, HorizonMetrics, MetadataDraft, ModelMetadata};
pub use registry::{LoadedModel, ModelBundle, ModelStore, PublishOptions};
pub use scaler::{Scaler, ScalerFile};
pub use utils::StoreError;
pub use validate::{Issue, IssueKind, Severity, ValidationReport};
pub use version::{BumpKind, SemVer, VersionTag};
