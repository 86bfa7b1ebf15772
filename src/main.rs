use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc_history::{Config, HistoryClient, ProgressEvent, ProgressReporter};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DOC_HISTORY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tracked documents at the newest commit
    Discover {
        /// Path to the git repository
        repo: PathBuf,
    },
    /// Extract the version history of tracked documents
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Path to the git repository
    repo: PathBuf,

    /// Restrict extraction to these paths (repeatable)
    #[arg(long = "select", value_name = "PATH")]
    select: Vec<String>,

    /// Commits per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent path lookups per commit
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop after this many seconds and return what was extracted (0 disables)
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Stream progress events to stdout as server-sent-event frames
    #[arg(long)]
    events: bool,

    /// Write the result JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries results and events
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::new().context("Failed to load configuration")?,
    };

    match cli.command {
        Command::Discover { repo } => discover(config, repo).await,
        Command::Extract(args) => extract(config, args).await,
    }
}

async fn discover(config: Config, repo: PathBuf) -> Result<()> {
    let client = HistoryClient::with_config(config)?;
    let repo = HistoryClient::normalize_path(&repo.to_string_lossy())?;

    for path in client.discover_files(&repo).await? {
        println!("{}", path);
    }
    Ok(())
}

async fn extract(mut config: Config, args: ExtractArgs) -> Result<()> {
    if let Some(batch_size) = args.batch_size {
        config.extraction.batch_size = batch_size;
    }
    if let Some(concurrency) = args.concurrency {
        config.extraction.file_concurrency = concurrency;
    }
    if let Some(deadline_secs) = args.deadline_secs {
        config.extraction.deadline_secs = deadline_secs;
    }

    let client = HistoryClient::with_config(config)?;
    let repo = HistoryClient::normalize_path(&args.repo.to_string_lossy())?;

    let cancel = CancellationToken::new();
    spawn_deadline(client.config().extraction.deadline_secs, cancel.clone());

    let (progress, printer) = if args.events {
        let (progress, mut rx) = ProgressReporter::channel();
        let printer = tokio::spawn(async move {
            let stdout = std::io::stdout();
            while let Some(event) = rx.recv().await {
                write_event(&mut stdout.lock(), &event);
            }
        });
        (progress, Some(printer))
    } else {
        (ProgressReporter::disabled(), None)
    };

    let outcome = client
        .extract_history(&repo, &args.select, progress, cancel)
        .await;

    // The reporter is gone once extraction returns, so the printer drains and exits
    if let Some(printer) = printer {
        printer.await.context("Event printer task failed")?;
    }

    let result = outcome?;
    if result.cancelled {
        tracing::warn!("Deadline reached; result is partial");
    }

    if args.events && args.output.is_none() {
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    match args.output {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn spawn_deadline(deadline_secs: u64, cancel: CancellationToken) {
    if deadline_secs == 0 {
        return;
    }

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(deadline_secs)) => {
                tracing::info!("Deadline of {}s reached, cancelling", deadline_secs);
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}

fn write_event(out: &mut impl Write, event: &ProgressEvent) {
    match event.to_sse_frame() {
        Ok(frame) => {
            if let Err(e) = out.write_all(frame.as_bytes()).and_then(|_| out.flush()) {
                tracing::warn!("Failed to write event: {}", e);
            }
        }
        Err(e) => tracing::warn!("Failed to serialize event: {}", e),
    }
}
