//! `hoard`: reconcile repository metadata dumps into the catalogue.
//!
//! Reads `hoard.toml` (or the path given with `--config`) and `HOARD_*`
//! environment variables, opens the SQLite catalogue, and runs one
//! subcommand against it.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use hoard_batch::{Batch, BatchConfig, BatchOptions, ops, probe::HttpProbe};
use hoard_core::{
  record::{CanonicalRecord, RepoId, RepoPath},
  source::SourceKind,
  store::RecordStore,
};
use hoard_sources::{ProjectIndex, needs_project_index, open_input};
use hoard_store_sqlite::SqliteStore;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Repository metadata reconciliation")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "hoard.toml")]
  config: PathBuf,

  /// Catalogue database; overrides `store_path` from the configuration.
  #[arg(long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Args)]
struct Inputs {
  /// Format of the input files.
  #[arg(short, long)]
  kind: SourceKind,

  /// GHTorrent `projects.csv`, used to map GHTorrent ids to paths. Defaults
  /// to the input itself for a single `ghtorrent-projects` file.
  #[arg(long)]
  projects: Option<PathBuf>,

  /// Input files; gzip is detected automatically.
  #[arg(required = true)]
  files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
  /// Merge source records into the catalogue.
  Merge {
    #[command(flatten)]
    inputs: Inputs,

    /// Create records for sources that carry an id and a path but are not
    /// catalogued yet.
    #[arg(long)]
    create_missing: bool,
  },
  /// List source records that have no counterpart in the catalogue.
  Missing {
    #[command(flatten)]
    inputs: Inputs,
  },
  /// Mark every deleted record invisible.
  Repair,
  /// Probe repositories of unknown visibility over HTTP.
  VerifyVisibility {
    #[arg(long, default_value_t = 1000)]
    limit: usize,
  },
  /// Print stored records by id (`16335`, `#16335`) or path (`owner/name`).
  Show { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut config = BatchConfig::load(&cli.config)
    .with_context(|| format!("failed to read config {:?}", cli.config))?;
  if let Some(store) = cli.store {
    config.store_path = store;
  }

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

  match cli.command {
    Command::Merge { inputs, create_missing } => {
      let index = load_index(&inputs)?;
      let options = BatchOptions {
        create_missing: create_missing || config.create_missing,
        ..BatchOptions::from(&config)
      };
      let mut batch = Batch::new(&store, options);
      for path in &inputs.files {
        info!("reading {path:?}");
        let reader = open_input(path).with_context(|| format!("failed to open {path:?}"))?;
        let records = hoard_sources::records(inputs.kind, reader, index.as_ref())?;
        batch
          .process_all(records)
          .await
          .with_context(|| format!("batch aborted in {path:?}"))?;
      }
      let summary = batch.finish();
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Command::Missing { inputs } => {
      let index = load_index(&inputs)?;
      for path in &inputs.files {
        let reader = open_input(path).with_context(|| format!("failed to open {path:?}"))?;
        let records = hoard_sources::records(inputs.kind, reader, index.as_ref())?;
        for label in ops::find_missing(&store, records).await? {
          println!("{label}");
        }
      }
    }

    Command::Repair => {
      let fixed = ops::repair(&store, Utc::now()).await?;
      println!("{fixed} records repaired");
    }

    Command::VerifyVisibility { limit } => {
      let probe = HttpProbe::new(&config.probe).context("failed to build HTTP client")?;
      let summary = ops::verify_visibility(&store, &probe, limit, Utc::now()).await?;
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Command::Show { key } => {
      let records = lookup(&store, &key).await?;
      if records.is_empty() {
        bail!("no record matches {key:?}");
      }
      for record in records {
        println!("{}", serde_json::to_string_pretty(&record)?);
      }
    }
  }

  Ok(())
}

/// Build the GHTorrent project index when the input kind needs one.
fn load_index(inputs: &Inputs) -> anyhow::Result<Option<ProjectIndex>> {
  if !needs_project_index(inputs.kind) {
    return Ok(None);
  }
  let path: &Path = match (&inputs.projects, inputs.kind, inputs.files.as_slice()) {
    (Some(projects), _, _) => projects,
    (None, SourceKind::GhtorrentProjects, [single]) => single,
    _ => bail!("--projects is required for {} input", inputs.kind),
  };
  info!("indexing {path:?}");
  let reader = open_input(path).with_context(|| format!("failed to open {path:?}"))?;
  let index =
    ProjectIndex::build(reader).with_context(|| format!("failed to index {path:?}"))?;
  Ok(Some(index))
}

async fn lookup(store: &SqliteStore, key: &str) -> anyhow::Result<Vec<CanonicalRecord>> {
  if let Ok(id) = key.parse::<RepoId>() {
    return Ok(store.get(id).await?.into_iter().collect());
  }
  let path: RepoPath = key.parse()?;
  Ok(store.find_by_path(&path).await?)
}
