//! Ripple-Parse main entry point
//!
//! This is the command-line interface for canonicalizing URLs and parsing
//! single documents the way the crawl pipeline would.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ripple_parse::config::{load_config_with_hash, Config};
use ripple_parse::processor::{
    work_queue, Collector, Dispatcher, DocumentProcessor, ParsedRecord, StatusEvent, WorkItem,
};
use ripple_parse::url::BasicNormalizer;
use ripple_parse::Metadata;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Parse: URL canonicalization and outlink extraction
///
/// Produces one canonical string per URL and turns fetched documents into
/// parsed records and discovered outlinks.
#[derive(Parser, Debug)]
#[command(name = "ripple-parse")]
#[command(version = "1.0.0")]
#[command(about = "URL canonicalization and outlink extraction", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical form of each URL
    Canonicalize {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// Parse a document stored in a file as if it had been fetched from URL
    Parse {
        /// URL the document was fetched from
        #[arg(long)]
        url: String,

        /// Content type reported by the server
        #[arg(long, default_value = "text/html")]
        content_type: String,

        /// File holding the document bytes
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Canonicalize { urls } => handle_canonicalize(&config, &urls),
        Command::Parse {
            url,
            content_type,
            file,
        } => handle_parse(config, url, content_type, file).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_parse=info,warn"),
            1 => EnvFilter::new("ripple_parse=debug,info"),
            2 => EnvFilter::new("ripple_parse=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the `canonicalize` command
fn handle_canonicalize(config: &Config, urls: &[String]) -> anyhow::Result<()> {
    let normalizer = BasicNormalizer::new(&config.normalizer);

    for url in urls {
        match normalizer.normalize(url) {
            Ok(canonical) => println!("{}", canonical),
            Err(e) => println!("REJECTED {}: {}", url, e),
        }
    }

    Ok(())
}

/// Prints dispatcher output as it arrives
struct PrintingCollector;

impl Collector for PrintingCollector {
    fn emit_parsed(&self, record: ParsedRecord) {
        println!("PARSED {} ({} bytes)", record.url, record.content.len());
        print_metadata(&record.metadata);
        if !record.text.is_empty() {
            println!("  text: {}", record.text);
        }
    }

    fn emit_status(&self, event: StatusEvent) {
        println!("{} {}", event.status.as_str(), event.url);
        print_metadata(&event.metadata);
    }

    fn ack(&self, item_id: u64) {
        println!("ACK {}", item_id);
    }
}

fn print_metadata(metadata: &Metadata) {
    for (key, values) in metadata.iter() {
        println!("  {} = {}", key, values.join(" | "));
    }
}

/// Handles the `parse` command
async fn handle_parse(
    config: Config,
    url: String,
    content_type: String,
    file: PathBuf,
) -> anyhow::Result<()> {
    let content = std::fs::read(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let processor = Arc::new(DocumentProcessor::from_config(&config)?);
    let dispatcher = Dispatcher::new(
        Arc::clone(&processor),
        Arc::new(PrintingCollector),
        &config.dispatcher,
    );

    let (sender, receiver) = work_queue(&config.dispatcher);
    let mut metadata = Metadata::new();
    metadata.set_value("Content-Type", content_type);

    sender
        .send(WorkItem {
            id: 0,
            url,
            content,
            metadata,
        })
        .await
        .context("work queue closed")?;
    drop(sender);

    let summary = dispatcher.run(receiver).await;
    tracing::info!(
        "Processed {} document(s): {} succeeded, {} failed",
        summary.processed,
        summary.succeeded,
        summary.failed
    );

    println!("\nCounters:");
    for (name, count) in processor.counters().snapshot() {
        println!("  {}: {}", name, count);
    }

    Ok(())
}
