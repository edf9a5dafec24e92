//! Indexer CLI entry point (spec §6.6): `index`, `detect`, and `clear-repo`,
//! grounded on `rpg-cli/src/main.rs`'s clap-derive subcommand shape and on
//! `original_source/scripts/build_graph.py`'s `build`/`clear-repo` commands.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use graphrag_core::config::AppConfig;
use graphrag_core::Error;
use graphrag_indexer::pipeline;
use graphrag_store::gateway::GraphStoreGateway;
use graphrag_store::memory::InMemoryStore;
use graphrag_store::GraphStore;

#[derive(Parser)]
#[command(name = "graphrag-indexer", about = "Indexes a repository into the code-intelligence graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the repository type, extract entities and edges, and upsert them.
    Index {
        /// Path to the repository to index.
        path: PathBuf,

        /// Repository identifier (defaults to the directory name).
        #[arg(long)]
        repository_id: Option<String>,

        /// Force a schema profile instead of auto-detecting (ansible, python, generic).
        #[arg(long)]
        profile: Option<String>,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// Run only the repo-type detector and print its result.
    Detect {
        path: PathBuf,
    },

    /// Remove every node belonging to a repository (Role nodes are shared, and kept).
    ClearRepo {
        repository_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Index { path, repository_id, profile, batch_size, max_workers } => {
            run_index(&config, path, repository_id, profile, batch_size, max_workers).await
        }
        Commands::Detect { path } => run_detect(&path),
        Commands::ClearRepo { repository_id } => run_clear_repo(&config, &repository_id).await,
    }
}

async fn run_index(
    config: &AppConfig,
    path: PathBuf,
    repository_id: Option<String>,
    profile: Option<String>,
    batch_size: Option<usize>,
    max_workers: Option<usize>,
) -> ExitCode {
    let repository_id = repository_id
        .or_else(|| config.pipeline.repository_id.clone())
        .unwrap_or_else(|| path.file_name().and_then(|n| n.to_str()).unwrap_or("repo").to_string());
    let batch_size = batch_size.unwrap_or(config.pipeline.batch_size);
    let max_workers = max_workers.unwrap_or(config.pipeline.max_workers);

    eprintln!("Indexing {} as repository '{repository_id}'", path.display());

    let store = GraphStoreGateway::new(InMemoryStore::new, config.store.query_timeout);
    let outcome = pipeline::index_repository(
        store,
        &path,
        &repository_id,
        profile.as_deref(),
        batch_size,
        max_workers,
    )
    .await;

    match outcome {
        Ok((_store, summary)) => {
            eprintln!(
                "Profile: {} (confidence {:.2})",
                summary.profile, summary.confidence
            );
            eprintln!(
                "Extracted {} nodes, {} edges",
                summary.nodes_extracted, summary.edges_extracted
            );
            eprintln!("Index build complete.");
            ExitCode::SUCCESS
        }
        Err(err) => report_failure(&err),
    }
}

fn run_detect(path: &PathBuf) -> ExitCode {
    if !path.is_dir() {
        eprintln!("Error: not a directory: {}", path.display());
        return ExitCode::from(1);
    }
    let result = graphrag_extract::detect::detect_repo_type(path);
    println!("profile: {}", result.profile);
    println!("confidence: {:.2}", result.confidence);
    println!("indicators: {}", result.indicators.join(", "));
    ExitCode::SUCCESS
}

async fn run_clear_repo(config: &AppConfig, repository_id: &str) -> ExitCode {
    if let Err(err) = pipeline::validate_repository_id(repository_id) {
        return report_failure(&err);
    }
    let store = GraphStoreGateway::new(InMemoryStore::new, config.store.query_timeout);
    match store.clear_repository(repository_id).await {
        Ok(()) => {
            eprintln!("Cleared repository '{repository_id}'.");
            ExitCode::SUCCESS
        }
        Err(err) => report_failure(&err),
    }
}

/// Maps a `graphrag_core::Error` onto the spec's two non-zero exit codes:
/// user errors (bad path, unknown profile, invalid id) exit 1; everything
/// else is treated as an unrecoverable store/configuration error and exits
/// 2 (spec §6.6).
fn report_failure(err: &Error) -> ExitCode {
    eprintln!("Error: {err}");
    match err {
        Error::UserInput(_) => ExitCode::from(1),
        _ => ExitCode::from(2),
    }
}
