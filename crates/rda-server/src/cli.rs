//! Command-line interface of the `rda-server` binary

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::config::{Config, Feeds, SourceKind};
use crate::job::{BoundedLoadJob, JobSettings, NdjsonFileSinkFactory, ProcessingOutcome};
use crate::job::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_RUNTIME};
use crate::model::{FissClaimChange, McsClaimChange};
use crate::server::{ChangeStream, SourceFactory};
use crate::source::{RecordSource, Sequenced};

/// RDA claim-change feed server
#[derive(Parser, Debug)]
#[command(name = "rda-server")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Feed {
    Fiss,
    Mcs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream changes from a feed as NDJSON
    Stream {
        #[arg(long, value_enum)]
        feed: Feed,

        /// First sequence number to send
        #[arg(long, default_value_t = 0)]
        since: i64,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one bounded load job into an NDJSON file
    Load {
        #[arg(long, value_enum)]
        feed: Feed,

        #[arg(long, default_value_t = 0)]
        since: i64,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        max_records: Option<usize>,

        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        #[arg(long, default_value_t = DEFAULT_MAX_RUNTIME.as_secs())]
        max_runtime_secs: u64,
    },

    /// Maintain the local object-storage cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Check that both feeds can be opened
    Check,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CacheCommand {
    /// Delete cache files for objects that changed or disappeared
    Prune,
    /// Delete every cache file
    Purge,
}

/// Runs `cli.command` against the configured sources.
pub async fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    if let Commands::Cache { command } = &cli.command {
        return run_cache(*command, config).await;
    }

    let feeds = config.feeds().await?;
    let result = match &cli.command {
        Commands::Stream {
            feed,
            since,
            output,
        } => run_stream(config, &feeds, *feed, *since, output.as_deref()).await,
        Commands::Load {
            feed,
            since,
            output,
            max_records,
            batch_size,
            max_runtime_secs,
        } => {
            let settings = JobSettings {
                starting_sequence_number: *since,
                max_records: max_records.unwrap_or(usize::MAX),
                batch_size: *batch_size,
                max_runtime: Duration::from_secs(*max_runtime_secs),
            };
            run_load(&feeds, *feed, output, settings).await
        },
        Commands::Check => run_check(&feeds).await,
        Commands::Cache { .. } => Ok(()),
    };

    if let Some(cache) = &feeds.cache {
        if let Err(e) = cache.close().await {
            warn!(error = %e, "Failed to clean up cache");
        }
    }
    result
}

async fn run_stream(
    config: &Config,
    feeds: &Feeds,
    feed: Feed,
    since: i64,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let service = config.service(feeds);
    let writer: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let sent = match feed {
        Feed::Fiss => write_stream(service.get_fiss_claims(since).await?, writer).await?,
        Feed::Mcs => write_stream(service.get_mcs_claims(since).await?, writer).await?,
    };
    info!(?feed, since, sent, "Stream finished");
    Ok(())
}

/// Copies `stream` to `writer` one JSON document per line until the stream
/// ends or the process is interrupted.
async fn write_stream<T>(
    mut stream: ChangeStream<T>,
    writer: Box<dyn AsyncWrite + Unpin + Send>,
) -> anyhow::Result<usize>
where
    T: Serialize,
{
    let mut writer = BufWriter::new(writer);
    let mut sent = 0usize;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let result = loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(record)) => {
                    let mut line = serde_json::to_vec(&record)?;
                    line.push(b'\n');
                    writer.write_all(&line).await?;
                    sent += 1;
                },
                Some(Err(e)) => break Err(anyhow::Error::new(e).context("Stream failed")),
                None => break Ok(sent),
            },
            _ = &mut interrupted => {
                info!(sent, "Interrupted, cancelling stream");
                stream.cancel();
                break Ok(sent);
            },
        }
    };

    writer.flush().await?;
    result
}

async fn run_load(
    feeds: &Feeds,
    feed: Feed,
    output: &Path,
    settings: JobSettings,
) -> anyhow::Result<()> {
    let outcome = match feed {
        Feed::Fiss => {
            let sinks = Arc::new(NdjsonFileSinkFactory::<FissClaimChange>::new(output));
            BoundedLoadJob::new(feeds.fiss.clone(), sinks, settings).call().await
        },
        Feed::Mcs => {
            let sinks = Arc::new(NdjsonFileSinkFactory::<McsClaimChange>::new(output));
            BoundedLoadJob::new(feeds.mcs.clone(), sinks, settings).call().await
        },
    };
    report_outcome(outcome)
}

fn report_outcome(outcome: ProcessingOutcome) -> anyhow::Result<()> {
    println!(
        "{:?}: {} records processed",
        outcome.outcome, outcome.processed_count
    );
    match outcome.error {
        Some(e) => Err(anyhow::Error::new(e).context(format!(
            "Load failed after {} records",
            outcome.processed_count
        ))),
        None => Ok(()),
    }
}

async fn run_check(feeds: &Feeds) -> anyhow::Result<()> {
    let fiss = check_feed("fiss", feeds.fiss.as_ref()).await?;
    let mcs = check_feed("mcs", feeds.mcs.as_ref()).await?;
    println!("fiss: {}", if fiss { "records available" } else { "empty" });
    println!("mcs: {}", if mcs { "records available" } else { "empty" });
    Ok(())
}

async fn check_feed<T>(name: &str, factory: &dyn SourceFactory<T>) -> anyhow::Result<bool>
where
    T: Sequenced + Send + 'static,
{
    let mut source = factory
        .create(crate::model::MIN_SEQUENCE_NUM)
        .await
        .with_context(|| format!("Failed to open {name} feed"))?;
    let result = source.has_more().await;
    let result = rda_common::error::merge_close_result(result, source.close().await)
        .with_context(|| format!("Failed to read {name} feed"))?;
    info!(feed = name, has_records = result, "Feed reachable");
    Ok(result)
}

async fn run_cache(command: CacheCommand, config: &Config) -> anyhow::Result<()> {
    if config.source != SourceKind::S3 {
        anyhow::bail!("Cache maintenance requires RDA_SOURCE=s3");
    }
    let cache = config.open_cache().await?;
    let removed = match command {
        CacheCommand::Prune => cache.delete_obsolete_files().await?,
        CacheCommand::Purge => cache.delete_all_files().await?,
    };
    println!("Removed {removed} cache files from {}", cache.cache_dir().display());
    Ok(())
}
