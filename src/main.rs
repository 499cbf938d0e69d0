// projeto: lstmmodelstore
// file: src/main.rs
// CLI para o repositório versionado de modelos LSTM por índice de mercado

use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use lstmmodelstore::config::{Config, ResolvedConfig, DEFAULT_CONFIG_FILE};
use lstmmodelstore::storage::utils::IoContext;
use lstmmodelstore::{
    BumpKind, IndexName, MetadataDraft, ModelBundle, ModelStore, PublishOptions, ScalerFile,
    ScalerKind, SemVer, StoreError,
};

#[derive(Parser, Debug)]
#[command(
    name = "modelstore",
    version = "0.1.0",
    about = "Versioned store for trained LSTM stock-index models, metadata and scalers",
    long_about = "Manages <root>/<INDEX>/v<semver>_<YYYYMMDD>_<HHMMSS>/ directories holding a model artifact, its model_metadata.json sidecar and the scalers/ directory (7d, 14d, 30d and feature scalers)."
)]
struct Cli {
    /// Arquivo de configuração TOML
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Sobrescreve store.root da configuração
    #[arg(long)]
    root: Option<PathBuf>,

    /// Modo verboso de logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the model root and write a default config file if none exists
    Init,

    /// Publish a new version for an index
    Publish {
        #[arg(long)]
        index: String,

        /// Model artifact to store (opaque bytes)
        #[arg(long)]
        artifact: PathBuf,

        /// Directory holding scaler_7d.json, scaler_14d.json, scaler_30d.json and feature_scaler.json
        #[arg(long)]
        scalers: PathBuf,

        /// JSON manifest with seq_length, feature_names, metrics, hyperparameters, notes
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Explicit version (e.g. 1.3.0); defaults to bumping the latest
        #[arg(long)]
        version: Option<String>,

        #[arg(long, value_enum, default_value = "minor")]
        bump: BumpArg,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List indices, or the versions of one index
    List {
        #[arg(long)]
        index: Option<String>,
    },

    /// Show metadata of a version (latest by default)
    Show {
        #[arg(long)]
        index: String,

        #[arg(long)]
        version: Option<String>,
    },

    /// Check the directory shape of the whole root or one index
    Validate {
        #[arg(long)]
        index: Option<String>,
    },

    /// Delete all but the newest N versions of an index
    Prune {
        #[arg(long)]
        index: String,

        /// Defaults to retention.keep_versions
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Report the version with the lowest mean validation loss
    Best {
        #[arg(long)]
        index: String,
    },

    /// Delete one version
    Remove {
        #[arg(long)]
        index: String,

        #[arg(long)]
        version: String,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BumpArg {
    Major,
    Minor,
    Patch,
}

impl From<BumpArg> for BumpKind {
    fn from(arg: BumpArg) -> Self {
        match arg {
            BumpArg::Major => BumpKind::Major,
            BumpArg::Minor => BumpKind::Minor,
            BumpArg::Patch => BumpKind::Patch,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let start_time = Instant::now();

    let resolved = match Config::resolve(&cli.config, cli.root.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            setup_logging(cli.verbose, log::LevelFilter::Info);
            error!("❌ Erro de configuração: {}", e);
            std::process::exit(1);
        }
    };
    setup_logging(
        cli.verbose,
        resolved.effective.log_level().unwrap_or(log::LevelFilter::Info),
    );
    resolved.log_source(&cli.config);

    match run(&cli, &resolved) {
        Ok(true) => {
            info!("🏁 Finalizado em {:.2}s", start_time.elapsed().as_secs_f64());
        }
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("❌ Erro: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_logging(verbose: bool, configured: log::LevelFilter) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        configured
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

/// Returns `Ok(false)` when the command ran but found problems (validation errors).
fn run(cli: &Cli, resolved: &ResolvedConfig) -> Result<bool, StoreError> {
    let config = &resolved.effective;
    match &cli.command {
        Command::Init => {
            let store = ModelStore::open(config)?;
            // --root and LSTMSTORE_ROOT stay out of the written file
            if !resolved.from_file {
                resolved.on_disk.save(&cli.config)?;
            }
            println!("📁 Model root ready: {}", store.layout().root().display());
        }

        Command::Publish {
            index,
            artifact,
            scalers,
            metadata,
            version,
            bump,
            notes,
        } => {
            let store = ModelStore::open(config)?;
            let index = IndexName::new(index)?;

            let mut draft = match metadata {
                Some(path) => MetadataDraft::load(path)?,
                None => MetadataDraft::default(),
            };
            if notes.is_some() {
                draft.notes = notes.clone();
            }

            let bundle = ModelBundle {
                artifact: fs::read(artifact).at(artifact)?,
                metadata: draft.into_metadata(),
                scalers: read_scalers_dir(scalers)?,
            };
            let options = PublishOptions {
                version: version.as_deref().map(str::parse::<SemVer>).transpose()?,
                bump: bump.clone().into(),
                created_at: None,
            };

            let tag = store.publish(&index, bundle, options)?;
            println!("✅ Published {}/{}", index, tag);
        }

        Command::List { index } => {
            let store = ModelStore::open(config)?;
            match index {
                Some(index) => {
                    let index = IndexName::new(index)?;
                    let versions = store.list_versions(&index)?;
                    println!("📋 {} ({} versions)", index, versions.len());
                    for tag in versions {
                        println!("   ├── {}", tag);
                    }
                }
                None => {
                    let indices = store.list_indices()?;
                    println!("📋 {} indices under {}", indices.len(), store.layout().root().display());
                    for index in indices {
                        let latest = store
                            .latest_version(&index)?
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!("   ├── {} (latest: {})", index, latest);
                    }
                }
            }
        }

        Command::Show { index, version } => {
            let store = ModelStore::open(config)?;
            let index = IndexName::new(index)?;
            let loaded = match version {
                Some(v) => {
                    let tag = store.find_version(&index, v.parse::<SemVer>()?)?;
                    store.load(&index, &tag)?
                }
                None => store.load_latest(&index)?,
            };

            let meta = &loaded.metadata;
            println!("📈 {} {}", loaded.index, loaded.tag);
            println!("   ├── Model Type: {}", meta.model_type);
            println!("   ├── Created: {}", meta.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("   ├── Artifact: {} ({} bytes)", meta.artifact.file, meta.artifact.size_bytes);
            println!("   ├── SHA256: {}", meta.artifact.sha256);
            println!("   ├── Seq Length: {}", meta.seq_length);
            println!("   ├── Features: {}", meta.feature_names.join(", "));
            for (horizon, m) in &meta.metrics {
                println!(
                    "   ├── {}: val_loss {:.6} | RMSE {:.4} | MAE {:.4} | MAPE {:.2}% | Dir {:.2}% | R² {:.4}",
                    horizon,
                    m.val_loss,
                    m.rmse,
                    m.mae,
                    m.mape,
                    m.directional_accuracy * 100.0,
                    m.r_squared
                );
            }
            for kind in ScalerKind::ALL {
                if let Some(s) = loaded.scaler(kind) {
                    println!("   ├── {}: {} features", kind.file_name(), s.scaler.n_features());
                }
            }
            if let Some(notes) = &meta.notes {
                println!("   └── Notes: {}", notes);
            }
        }

        Command::Validate { index } => {
            let store = ModelStore::open(config)?;
            let index = index.as_deref().map(IndexName::new).transpose()?;
            let report = store.validate(index.as_ref())?;

            for issue in &report.issues {
                println!("{}", issue);
            }
            println!(
                "🔍 {} indices, {} versions checked: {} errors, {} warnings",
                report.checked_indices,
                report.checked_versions,
                report.error_count(),
                report.warning_count()
            );
            return Ok(report.is_ok());
        }

        Command::Prune { index, keep } => {
            let store = ModelStore::open(config)?;
            let index = IndexName::new(index)?;
            let removed = store.prune(&index, keep.unwrap_or(config.retention.keep_versions))?;
            println!("🧹 Removed {} versions from {}", removed.len(), index);
            for tag in removed {
                println!("   ├── {}", tag);
            }
        }

        Command::Best { index } => {
            let store = ModelStore::open(config)?;
            let index = IndexName::new(index)?;
            match store.best_version(&index)? {
                Some((tag, loss)) => println!("🎯 {} best: {} (mean val_loss {:.6})", index, tag, loss),
                None => println!("🎯 {}: no version with validation metrics", index),
            }
        }

        Command::Remove { index, version } => {
            let store = ModelStore::open(config)?;
            let index = IndexName::new(index)?;
            let tag = store.find_version(&index, version.parse::<SemVer>()?)?;
            store.remove_version(&index, &tag)?;
            println!("🗑️ Removed {}/{}", index, tag);
        }
    }

    Ok(true)
}

fn read_scalers_dir(dir: &Path) -> Result<Vec<ScalerFile>, StoreError> {
    let mut scalers = Vec::new();
    for kind in ScalerKind::ALL {
        let path = dir.join(kind.file_name());
        if !path.is_file() {
            return Err(StoreError::MissingScaler(path.display().to_string()));
        }
        let file = ScalerFile::load(&path)?;
        if file.kind != kind {
            return Err(StoreError::InvalidArgument(format!(
                "{} declares {}",
                path.display(),
                file.kind
            )));
        }
        scalers.push(file);
    }
    Ok(scalers)
}
