use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::process::Termination;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use thiserror::Error;

use crate::config::catalog::CatalogConfig;
use crate::config::global::{GlobalConfig, MissingTokenError};
use crate::index::aggregate::{aggregate, AggregateError};
use crate::index::resolve::MetadataMode;
use crate::publish::{publish, PublishError};
use crate::release_site::{GitHub, Offline, ReleaseSource, ReleaseSourceError};
use crate::uwu_colors::{ErrStyle, SUCCESS_STYLE};

mod checks;
mod config;
mod index;
mod publish;
mod release_site;
mod uwu_colors;

/// Builds the mod source index (`mods.json`) from a catalog and the releases of each entry.
///
/// The catalog (`config.yaml`) lists every mod and texture pack:
/// - `metadata.name` names the source
/// - `mods` and `texture_packs` map a key to display fields, art, and either an
///   `external_link` or a `repo_owner`/`repo_name` to poll for releases
///
/// Full mode needs a `GITHUB_TOKEN` in the environment.
#[derive(Parser)]
#[clap(verbatim_doc_comment)]
pub struct ModSource {
    /// What to do. Without a mode, the index is rebuilt and published if it changed.
    #[clap(value_enum)]
    pub mode: Option<RunMode>,
    /// Catalog to read.
    #[clap(long, default_value = "config.yaml")]
    pub config: PathBuf,
    /// Index document to compare against and write.
    #[clap(long, default_value = "../../site/mods.json")]
    pub output: PathBuf,
    /// Verbosity level, repeat to increase.
    #[clap(short, action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum RunMode {
    /// Validate the catalog without touching the network or the index.
    Lint,
    /// Rewrite each mod release's `metadata.json` from the catalog. Does not publish.
    FixMetadata,
}

#[derive(Debug, Error)]
enum ModSourceError {
    #[error("Catalog load error: {0}")]
    ConfigLoad(#[from] ConfigLoadError),
    #[error(transparent)]
    MissingToken(#[from] MissingTokenError),
    #[error("Release source error: {0}")]
    ReleaseSource(#[from] ReleaseSourceError),
    #[error("Index error: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Debug, Error)]
enum ConfigLoadError {
    #[error("Couldn't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML Parse Error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),
}

impl Termination for ModSourceError {
    fn report(self) -> ExitCode {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: ModSource = ModSource::parse();
    let verbosity = args.verbosity;
    env_logger::Builder::new()
        .filter_level(match verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .format(move |buf, record| {
            write!(buf, "[{}] ", buf.default_level_style(record.level()))?;

            if verbosity > 0 {
                // Include the location of the log message if verbose.
                if let Some(p) = record.module_path() {
                    write!(buf, "[{}] ", p)?;
                } else {
                    write!(buf, "[unknown] ")?;
                }
            }

            writeln!(buf, "{}", record.args())
        })
        .init();

    match main_for_result(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            e.report()
        }
    }
}

async fn main_for_result(args: ModSource) -> Result<(), ModSourceError> {
    let catalog = load_catalog(&args.config)?;

    match args.mode {
        Some(RunMode::Lint) => {
            log::info!("lint mode enabled");
            aggregate(&catalog, &Offline, MetadataMode::Standard).await?;
            log::info!("{}", "Catalog is valid.".errstyle(SUCCESS_STYLE));
        }
        Some(RunMode::FixMetadata) => {
            let source = live_source()?;
            aggregate(&catalog, source.as_ref(), MetadataMode::Legacy).await?;
            log::info!("{}", "Release metadata synchronized.".errstyle(SUCCESS_STYLE));
        }
        None => {
            let source = live_source()?;
            let document = aggregate(&catalog, source.as_ref(), MetadataMode::Standard).await?;
            publish(&document, &args.output, chrono::Utc::now()).await?;
        }
    }

    Ok(())
}

fn load_catalog(path: &Path) -> Result<CatalogConfig, ConfigLoadError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(serde_yaml_ng::from_str::<CatalogConfig>(&s)?)
}

fn live_source() -> Result<Box<dyn ReleaseSource>, ModSourceError> {
    let config = GlobalConfig::from_env()?;
    Ok(Box::new(GitHub::new(&config)?))
}
