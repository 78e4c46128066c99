//! chronicle - rebuild a git commit history from published release archives
//!
//! This is the command-line entry point: it wires the manifest catalog,
//! the caching fetcher and the tar.gz reader into the history updater
//! and prints the final commit id.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chronicle::archive::{ArchiveFetcher, HttpFetcher, TarGzReader};
use chronicle::catalog::ManifestCatalog;
use chronicle::history::{HistoryUpdater, UpdaterConfig};
use chronicle::store::{GitStore, Identity};

#[derive(Parser)]
#[command(
    name = "chronicle",
    about = "Rebuild a git commit history from published release archives",
    version
)]
struct Cli {
    /// path to the git repository that receives the history
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// URL of the JSON release manifest
    #[arg(short, long)]
    manifest: String,

    /// directory for cached archive downloads (defaults to the system
    /// temp dir, like the original script)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// branch that tracks the newest release
    #[arg(long, default_value = "latest")]
    latest_ref: String,

    /// project name used as commit author and message prefix
    #[arg(long, default_value = "Datomic")]
    project: String,

    /// committer email address
    #[arg(long, default_value = "info@datomic.com")]
    email: String,

    /// archive prefetch worker threads (0 disables prefetching)
    #[arg(long, default_value_t = 2)]
    prefetch: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let store = GitStore::open_or_init(&cli.repo)
        .with_context(|| format!("opening repository at {}", cli.repo.display()))?;

    let cache_dir = cli.cache.unwrap_or_else(std::env::temp_dir);
    let fetcher: Arc<dyn ArchiveFetcher> = Arc::new(
        HttpFetcher::new(cache_dir.clone())
            .with_context(|| format!("preparing cache at {}", cache_dir.display()))?,
    );

    let catalog = ManifestCatalog::new(cli.manifest);
    let config = UpdaterConfig::default()
        .latest_ref(cli.latest_ref)
        .project(cli.project.clone())
        .identity(Identity::new(cli.project, cli.email))
        .prefetch_workers(cli.prefetch);

    let head = HistoryUpdater::with_config(store, config)
        .run(&catalog, fetcher, &TarGzReader::new())
        .context("history update failed")?;

    println!("{head}");
    Ok(())
}
