//! Embeds logged sensor readings into DNG image metadata.
//!
//! Companion tool to the vireo ingest server: picks one reading out of
//! the shared JSON log by signed index (default: the latest) and writes
//! it into one DNG, or every DNG in a directory, via exiftool.

mod correlator;
mod embedder;
mod metadata;
mod writer;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use correlator::correlate;
use embedder::Embedder;
use metadata::MetadataFields;
use tracing::{warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vireo_readings::{ReadingStore, DEFAULT_DATA_FILE};
use writer::{ExiftoolWriter, DEFAULT_TOOL};

/// Embed logged sensor readings into DNG image metadata.
#[derive(Parser, Debug)]
#[command(name = "vireo-embed", version, about)]
struct Args {
    /// DNG file or directory of DNG files
    target: PathBuf,

    /// Reading to embed; negative counts back from the latest
    #[arg(default_value_t = -1, allow_negative_numbers = true)]
    index: i64,

    /// Path of the sensor log written by the ingest server
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    data_file: PathBuf,

    /// Metadata tool to invoke
    #[arg(long, default_value = DEFAULT_TOOL)]
    exiftool: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format (json, pretty)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, &args.log_format)?;

    let store = ReadingStore::new(&args.data_file);
    let correlation = correlate(&store, &args.target, args.index).await?;

    let fields = MetadataFields::from_reading(&correlation.reading);
    let embedder = Embedder::new(ExiftoolWriter::new(&args.exiftool));
    let summary = embedder.run(&fields, &correlation.assets).await?;

    if !summary.all_succeeded() {
        warn!(
            embedded = summary.embedded,
            attempted = summary.attempted,
            "Some assets were not embedded"
        );
    }

    println!("Processed {}/{} files", summary.embedded, summary.attempted);

    Ok(())
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr; stdout carries only the run summary.
fn init_logging(level: &str, format: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("vireo_embed={}", level).parse()?)
        .add_directive(format!("vireo_readings={}", level).parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    if format == "json" {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
