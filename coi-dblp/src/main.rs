//! coi-dblp - dblp conflict-of-interest finder
//!
//! `index` builds the corpus snapshot, `annotate` resolves roster names to
//! dblp ids, `conflicts` writes the committee/submission conflict report.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use tracing::info;

use coi_common::config::{load_toml_config, DataFolderResolver, TomlConfig, DATA_FOLDER_ENV};
use coi_common::logging::init_logging;
use coi_dblp::annotate::Annotator;
use coi_dblp::clients::DblpClient;
use coi_dblp::error::StoreError;
use coi_dblp::matcher::{conflicts_by_member, find_conflicts};
use coi_dblp::resolver::{DecisionMaker, SkipDecisions, TerminalDecisions};
use coi_dblp::roster::{self, RosterTable};
use coi_dblp::{CorpusIndexer, CorpusSnapshot, IdentityResolver, IndexerConfig, SnapshotStore};

/// Command-line arguments for coi-dblp
#[derive(Parser, Debug)]
#[command(name = "coi-dblp")]
#[command(about = "Find reviewer/author conflicts of interest using dblp")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Folder holding the corpus snapshot
    #[arg(short, long, global = true, env = DATA_FOLDER_ENV)]
    data_folder: Option<PathBuf>,

    /// Year cutoff; overrides `min_year` from the config
    #[arg(long, global = true, conflicts_with = "all_years")]
    min_year: Option<i32>,

    /// Keep publications of every year
    #[arg(long, global = true)]
    all_years: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a dblp.xml.gz dump into the snapshot store
    Index {
        corpus: PathBuf,

        /// Rebuild even if the snapshot already exists
        #[arg(long)]
        force: bool,
    },

    /// Resolve roster names to dblp ids
    Annotate {
        roster: PathBuf,

        /// Output CSV (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask on the terminal when a name stays ambiguous
        #[arg(short, long)]
        interactive: bool,

        /// Corpus dump to index if the snapshot is missing
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Write conflicts between committee members and submissions
    Conflicts {
        committee: PathBuf,
        submissions: PathBuf,

        #[arg(short, long, default_value = "conflicts.csv")]
        output: PathBuf,

        /// Corpus dump to index if the snapshot is missing
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = load_toml_config(args.config.as_deref()).context("Failed to load config")?;
    init_logging(&loaded.config.logging).context("Failed to initialize logging")?;
    loaded.log_source();
    let config = loaded.config;

    info!("Starting coi-dblp {}", env!("CARGO_PKG_VERSION"));

    let data_folder = DataFolderResolver::new(args.data_folder.clone(), config.data_folder.clone())
        .ensure()
        .context("Failed to initialize data folder")?;

    let indexer = CorpusIndexer::new(IndexerConfig {
        min_year: if args.all_years {
            None
        } else {
            args.min_year.or(config.min_year)
        },
        year_policy: config.year_policy,
    });
    let store = SnapshotStore::new(&data_folder, indexer.config().min_year);

    match args.command {
        Command::Index { corpus, force } => {
            open_snapshot(store, indexer, Some(corpus), force).await?;
        }
        Command::Annotate {
            roster,
            output,
            interactive,
            corpus,
        } => {
            let snapshot = open_snapshot(store, indexer, corpus, false).await?;
            let output = output.unwrap_or_else(|| roster.clone());
            annotate(&config, &snapshot, &roster, &output, interactive).await?;
        }
        Command::Conflicts {
            committee,
            submissions,
            output,
            corpus,
        } => {
            let snapshot = open_snapshot(store, indexer, corpus, false).await?;
            conflicts(&snapshot, &committee, &submissions, &output)?;
        }
    }

    Ok(())
}

/// Load the snapshot, indexing `corpus` if needed
///
/// Indexing is CPU-bound and runs on the blocking pool.
async fn open_snapshot(
    store: SnapshotStore,
    indexer: CorpusIndexer,
    corpus: Option<PathBuf>,
    force: bool,
) -> Result<CorpusSnapshot> {
    let snapshot = tokio::task::spawn_blocking(move || match corpus {
        Some(corpus) => store
            .load_or_build(&corpus, &indexer, force)
            .with_context(|| format!("Failed to build snapshot from {}", corpus.display())),
        None => match store.load() {
            Err(StoreError::NotBuilt(folder)) => {
                bail!("No snapshot in {folder}; run `coi-dblp index <dblp.xml.gz>` first")
            }
            loaded => loaded.context("Failed to load snapshot"),
        },
    })
    .await
    .context("Snapshot task panicked")??;

    info!(
        authors = snapshot.author_pubs().len(),
        publications = snapshot.pub_authors().len(),
        disambiguation = snapshot.disambiguation().len(),
        "Snapshot ready"
    );
    Ok(snapshot)
}

async fn annotate(
    config: &TomlConfig,
    snapshot: &CorpusSnapshot,
    input: &Path,
    output: &Path,
    interactive: bool,
) -> Result<()> {
    let mut table = RosterTable::read(input)?;

    let client = DblpClient::new(&config.dblp).context("Failed to create dblp client")?;
    let decisions: Box<dyn DecisionMaker> = if interactive {
        Box::new(TerminalDecisions)
    } else {
        Box::new(SkipDecisions)
    };
    let venue_filter = Regex::new(&config.venue_filter)
        .with_context(|| format!("Invalid venue_filter '{}'", config.venue_filter))?;

    let resolver = IdentityResolver::new(snapshot, &client, &client, decisions.as_ref())
        .with_venue_filter(venue_filter)
        .with_base_url(client.base_url());
    let stats = Annotator::new(&resolver, &client)
        .annotate(&mut table)
        .await?;

    table.write(output)?;
    info!(
        resolved = stats.resolved,
        unresolved = stats.unresolved,
        "Updated CSV saved to {}",
        output.display()
    );
    Ok(())
}

fn conflicts(
    snapshot: &CorpusSnapshot,
    committee_path: &Path,
    submissions_path: &Path,
    output: &Path,
) -> Result<()> {
    let committee = roster::read_committee(committee_path)?;
    let submissions = roster::read_submissions(submissions_path)?;

    let records = find_conflicts(&committee, &submissions, snapshot);
    for (member, submissions) in conflicts_by_member(&records) {
        info!(member = %member, submissions = submissions.len(), "Member conflicts");
    }

    roster::conflict_report(&records, &committee).write(output)?;
    info!(conflicts = records.len(), "Conflict report saved to {}", output.display());
    Ok(())
}
