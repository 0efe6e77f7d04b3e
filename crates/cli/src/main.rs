//! # snatcher
//! Operator front end: builds a queue from a catalog or a folder scan, then
//! drives the acquisition engine while the operator relays commands to the
//! responder and pastes its replies back as JSON lines.

mod bridge;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::channel::mpsc;
use futures::StreamExt;
use snatcher_core::{EngineInput, RunSummary, Settings};
use snatcher_engine::{AcquisitionEngine, ItemProcessor, RequestQueue, ResponderSession};
use snatcher_fetch::ContentFetcher;
use snatcher_processors::{
    load_catalog, plan_downloads, scan_bundles, scan_maps, JdNextDownloader, ServerVideoUpgrader,
    UbiArtVideoUpgrader,
};
use snatcher_responder::ChannelResponder;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file to use instead of the one in the config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every JD Next map in the catalog that is not on disk yet
    Jdnext {
        /// Catalog JSON, as a local path or an http(s) URL
        #[arg(long)]
        database: String,
        /// Folder that receives one subfolder per map
        #[arg(long)]
        output: PathBuf,
    },
    /// Upgrade preview and main videos of downloaded maps
    ServerUpgrade {
        /// Folder of previously downloaded maps
        #[arg(long)]
        maps: PathBuf,
    },
    /// Fetch HD coach videos for maps found in UbiArt game bundles
    UbiartUpgrade {
        /// Folder holding the extracted bundles
        #[arg(long)]
        bundles: PathBuf,
        /// Folder that receives the replacement videos
        #[arg(long)]
        cache: PathBuf,
    },
}

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let fetcher = ContentFetcher::new(settings.fetch());

    let summary = match cli.command {
        Commands::Jdnext { database, output } => {
            println!("📥 Loading catalog from {}", database.cyan());
            let catalog = load_catalog(&database)
                .await
                .with_context(|| format!("Failed to load catalog {}", database))?;
            let plan = plan_downloads(catalog, &output)?;
            let processor = JdNextDownloader::new(fetcher, &output, plan.bundle_tags);
            drive(processor, plan.queue, &settings).await?
        }
        Commands::ServerUpgrade { maps } => {
            println!("🔍 Scanning {}", maps.display().to_string().cyan());
            let queue = scan_maps(&maps)?;
            drive(ServerVideoUpgrader::new(fetcher), queue, &settings).await?
        }
        Commands::UbiartUpgrade { bundles, cache } => {
            println!("🔍 Scanning {}", bundles.display().to_string().cyan());
            std::fs::create_dir_all(&cache)
                .with_context(|| format!("Failed to create cache folder {}", cache.display()))?;
            let plan = scan_bundles(&bundles, &cache)?;
            let processor = UbiArtVideoUpgrader::new(fetcher, &cache, plan.videos);
            drive(processor, plan.queue, &settings).await?
        }
    };

    log::debug!("Run finished: {:?}", summary);
    Ok(())
}

/// Wires the engine to the console: commands are printed, stdin feeds
/// replies and interrupts, Ctrl-C stops the run.
async fn drive<P>(
    processor: P,
    queue: RequestQueue<P::Item>,
    settings: &Settings,
) -> Result<RunSummary>
where
    P: ItemProcessor,
{
    if queue.is_empty() {
        println!("✅ Nothing to do for {}", processor.name().cyan());
        return Ok(RunSummary::default());
    }

    let (responder, mut outbox_rx, inbox_tx) = ChannelResponder::pair(16);
    let session = ResponderSession::new(Box::new(responder), settings.session());
    let policy = settings.retry_policy(processor.default_policy());

    let (input_tx, input_rx) = mpsc::channel(16);
    let (output_tx, mut output_rx) = mpsc::channel(64);

    // first Ctrl-C stops the engine, a second one exits right away
    let mut stop_tx = input_tx.clone();
    let stopping = AtomicBool::new(false);
    ctrlc::set_handler(move || {
        if stopping.swap(true, Ordering::SeqCst) {
            eprintln!("\n🛑 {}", "Interrupted".red());
            std::process::exit(130);
        }
        eprintln!("\n🛑 Stopping, press Ctrl-C again to quit now");
        let _ = stop_tx.try_send(EngineInput::Stop);
    })
    .context("Failed to install the Ctrl-C handler")?;

    async_std::task::spawn(bridge::forward_stdin(input_tx, inbox_tx));
    async_std::task::spawn(async move {
        while let Some(command) = outbox_rx.next().await {
            report::command(&command);
        }
    });
    let reporter = async_std::task::spawn(async move {
        while let Some(output) = output_rx.next().await {
            report::event(&output);
        }
    });

    println!(
        "💬 {} item(s) queued. Relay each command, paste the reply as one JSON line.",
        queue.count()
    );
    println!("(Type skip, stop, info or redo at any time)\n");

    let engine = AcquisitionEngine::new(processor, queue, session, policy);
    let summary = engine.run(input_rx, output_tx).await;
    reporter.await;
    Ok(summary)
}
