//! tolk CLI entry point.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tolk::config::Settings;
use tolk::driver::Driver;
use tolk::orchestrator::PipelineMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// tolk - Video ingestion for language learners
///
/// Watches an object-store bucket (or takes local files) and turns raw
/// videos into transcripts, translated subtitles, analysis, exercises,
/// and a streamable rendition.
#[derive(Parser, Debug)]
#[command(name = "tolk")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Keep polling the pending prefix instead of a one-shot pass
    #[arg(long)]
    watch: bool,

    /// Pipeline mode: full, no-exercises, transcription-only
    #[arg(long, default_value = "full")]
    mode: String,

    /// Local video files to process when s3_input is disabled
    inputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tolk={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    let mode: PipelineMode = cli
        .mode
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut driver = Driver::new(settings.clone(), mode).await?;

    if settings.s3_input.enabled {
        if cli.watch || settings.s3_input.enable_polling {
            driver.run_polling().await?;
        } else {
            let never = AtomicBool::new(false);
            driver.run_batch(&never).await?;
        }
    } else {
        if cli.inputs.is_empty() {
            bail!("No inputs: enable s3_input in the configuration or pass local video files");
        }
        driver.run_local(&cli.inputs).await?;
    }

    driver.shutdown().await?;
    Ok(())
}
