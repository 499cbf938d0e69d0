// projeto: lstmmodelstore
// file: src/config.rs
// Configuração do repositório de modelos (TOML)

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::layout::{DEFAULT_ARTIFACT_FILE, METADATA_FILE, SCALERS_DIR};
use crate::storage::utils::{write_atomic, IoContext, StoreError};

pub const DEFAULT_CONFIG_FILE: &str = "lstmmodelstore.toml";
pub const ROOT_ENV_VAR: &str = "LSTMSTORE_ROOT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub artifact_file: String,
    pub create: bool,
    pub verify_checksum: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub keep_versions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./models"),
            artifact_file: DEFAULT_ARTIFACT_FILE.to_string(),
            create: true,
            verify_checksum: true,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { keep_versions: 5 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration as stored on disk next to the effective one after overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub on_disk: Config,
    pub effective: Config,
    pub from_file: bool,
}

impl ResolvedConfig {
    pub fn log_source(&self, path: &Path) {
        if self.from_file {
            info!("⚙️ [Config] Loaded from {}", path.display());
        } else {
            info!("📄 [Config] {} not found, using defaults", path.display());
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let resolved = Self::resolve(path, None)?;
        resolved.log_source(path);
        Ok(resolved.effective)
    }

    /// Parses `path` without logging; `None` when the file does not exist.
    pub fn read_file(path: &Path) -> Result<Option<Self>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).at(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| StoreError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Some(config))
    }

    /// Reads `path`, then applies `LSTMSTORE_ROOT` and `root_override` (in that
    /// order) to the effective copy only. Logging is left to the caller.
    pub fn resolve(path: &Path, root_override: Option<&Path>) -> Result<ResolvedConfig, StoreError> {
        let file = Self::read_file(path)?;
        let from_file = file.is_some();
        let on_disk = file.unwrap_or_default();

        let mut effective = on_disk.clone();
        effective.apply_env();
        if let Some(root) = root_override {
            effective.store.root = root.to_path_buf();
        }
        effective.validate()?;

        Ok(ResolvedConfig {
            on_disk,
            effective,
            from_file,
        })
    }

    pub fn apply_env(&mut self) {
        if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
            if !root.trim().is_empty() {
                self.store.root = PathBuf::from(root);
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(path, text.as_bytes())?;
        info!("💾 [Config] Saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.store.root.as_os_str().is_empty() {
            return Err(StoreError::Config("store.root cannot be empty".to_string()));
        }

        let artifact = self.store.artifact_file.as_str();
        if artifact.is_empty()
            || artifact.contains(['/', '\\'])
            || artifact.starts_with('.')
            || artifact == METADATA_FILE
            || artifact == SCALERS_DIR
        {
            return Err(StoreError::Config(format!(
                "store.artifact_file '{}' is not a valid file name",
                artifact
            )));
        }

        if self.retention.keep_versions == 0 {
            return Err(StoreError::Config(
                "retention.keep_versions must be greater than zero".to_string(),
            ));
        }

        if self.log_level().is_none() {
            return Err(StoreError::Config(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<log::LevelFilter> {
        self.logging.level.parse::<log::LevelFilter>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.root, PathBuf::from("./models"));
        assert_eq!(config.store.artifact_file, "model.bin");
        assert_eq!(config.retention.keep_versions, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.store.artifact_file = "model_metadata.json".to_string();
        assert!(config.validate().is_err());

        config.store.artifact_file = "sub/model.bin".to_string();
        assert!(config.validate().is_err());

        config.store.artifact_file = "model.keras".to_string();
        assert!(config.validate().is_ok());

        config.retention.keep_versions = 0;
        assert!(config.validate().is_err());

        config.retention.keep_versions = 3;
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");
        fs::write(&path, "[retention]\nkeep_versions = 2\n").unwrap();

        let config: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.retention.keep_versions, 2);
        assert_eq!(config.store.artifact_file, "model.bin");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_then_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");
        let mut config = Config::default();
        config.store.root = dir.path().join("models");
        config.save(&path).unwrap();

        let parsed: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_resolve_keeps_overrides_off_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");
        fs::write(&path, "[store]\nroot = \"/srv/models\"\n").unwrap();

        let scratch = dir.path().join("scratch");
        let resolved = Config::resolve(&path, Some(&scratch)).unwrap();
        assert!(resolved.from_file);
        assert_eq!(resolved.effective.store.root, scratch);
        assert_eq!(resolved.on_disk.store.root, PathBuf::from("/srv/models"));

        let missing = Config::resolve(&dir.path().join("absent.toml"), Some(&scratch)).unwrap();
        assert!(!missing.from_file);
        assert_eq!(missing.on_disk, Config::default());
        assert_eq!(missing.effective.store.root, scratch);
    }

    #[test]
    fn test_read_file_missing_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(Config::read_file(&dir.path().join("absent.toml")).unwrap(), None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[store\nroot = 1").unwrap();
        assert!(matches!(Config::load(&path), Err(StoreError::Config(_))));
    }
}
