use adtrim::config::Config;
use adtrim::pipeline::{print_summary, process_files, PipelineConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "adtrim")]
#[command(version, about = "Remove advertisement segments from podcast audio")]
#[command(long_about = "Transcribe podcast audio, identify advertisement segments with an LLM \
classifier, and write a copy of each file with the ads spliced out.")]
struct Cli {
    /// Input audio file(s)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for output files (defaults to next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., en, ja, es)
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Seconds between transcription job polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Maximum number of poll attempts before giving up on a job
    #[arg(long)]
    max_polls: Option<u32>,

    /// Number of files processed concurrently
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Disable progress spinners
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load configuration and apply CLI overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    config.language = cli.language;
    if let Some(interval) = cli.poll_interval {
        config.poll_interval_secs = interval;
    }
    if let Some(attempts) = cli.max_polls {
        config.max_poll_attempts = attempts;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config.validate().context("Configuration validation failed")?;

    if let Some(ref dir) = cli.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    // Ctrl+C abandons in-flight jobs between stages and polls
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancelled.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, finishing up...");
        cancel_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    info!("Processing {} file(s)", cli.inputs.len());

    let pipeline_config = PipelineConfig {
        output_dir: cli.output_dir,
        show_progress: !cli.no_progress,
    };

    let outcomes = process_files(&cli.inputs, &config, &pipeline_config, cancelled).await?;

    print_summary(&outcomes);

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, outcomes.len());
    }

    Ok(())
}
