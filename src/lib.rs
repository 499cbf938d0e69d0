// projeto: lstmmodelstore
// file: src/lib.rs
// Versioned on-disk store for LSTM index models, their metadata and scalers

pub mod config;
pub mod storage;

pub use config::Config;
pub use storage::{
    BumpKind, Horizon, HorizonMetrics, IndexName, Layout, LoadedModel, MetadataDraft, ModelBundle,
    ModelMetadata, ModelStore, PublishOptions, Scaler, ScalerFile, ScalerKind, SemVer,
    StoreError, ValidationReport, VersionTag,
};
