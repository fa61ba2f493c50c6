use crate::audio::{derive_output_path, probe, splice};
use crate::classify::{AdClassifier, OpenAiClassifier};
use crate::config::Config;
use crate::error::{AdtrimError, Result};
use crate::timeline::{complement, ComplementOutcome};
use crate::transcribe::{FireworksClient, Transcriber};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Configuration for the ad-trimming pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Directory for output files (defaults to next to each input).
    pub output_dir: Option<PathBuf>,
    /// Show progress spinners.
    pub show_progress: bool,
}

/// Report for one successfully processed file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub output_path: PathBuf,
    pub outcome: ComplementOutcome,
    /// Merged ad runs that were removed.
    pub ad_runs: usize,
    /// Seconds of audio removed.
    pub removed_secs: f64,
    /// Original track duration in seconds.
    pub original_secs: f64,
    /// Output artifact duration in seconds.
    pub output_secs: f64,
    /// Transcript segments the classifier saw.
    pub transcript_segments: usize,
    /// Wall-clock time for this file.
    pub total_time: Duration,
}

/// Outcome of one file in a multi-file run. Failures are carried, not
/// propagated, so one bad file never halts the rest.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<FileReport>,
}

/// Build the transcription client from config.
pub fn create_transcriber(config: &Config) -> Result<Box<dyn Transcriber>> {
    let api_key = config.fireworks_api_key.clone().ok_or_else(|| {
        AdtrimError::Config(
            "Transcription API key not set. Set FIREWORKS_API_KEY environment variable."
                .to_string(),
        )
    })?;

    Ok(Box::new(
        FireworksClient::new(api_key, config.transcription_url.clone())
            .with_language(config.language.clone())
            .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
            .with_max_poll_attempts(config.max_poll_attempts),
    ))
}

/// Build the ad classifier from config.
pub fn create_classifier(config: &Config) -> Result<Box<dyn AdClassifier>> {
    let api_key = config.openai_api_key.clone().ok_or_else(|| {
        AdtrimError::Config(
            "Classifier API key not set. Set OPENAI_API_KEY environment variable.".to_string(),
        )
    })?;

    Ok(Box::new(
        OpenAiClassifier::new(api_key, config.classifier_url.clone())
            .with_model(config.classifier_model.clone()),
    ))
}

/// Run the full pipeline for one file: probe, transcribe, classify,
/// complement, splice. The output lands next to the input (or in the
/// configured directory) as `<stem>(trimmed-ads)<ext>`.
pub async fn process_file(
    input: &Path,
    transcriber: &dyn Transcriber,
    classifier: &dyn AdClassifier,
    pipeline_config: &PipelineConfig,
    cancelled: Arc<AtomicBool>,
    progress: Option<&ProgressBar>,
) -> Result<FileReport> {
    let start_time = Instant::now();
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    if !input.exists() {
        return Err(AdtrimError::FileNotFound(input.display().to_string()));
    }

    let set_stage = |msg: &str| {
        if let Some(pb) = progress {
            pb.set_message(format!("{file_name}: {msg}"));
        }
    };

    // Stage 1: probe the audio container.
    set_stage("probing audio");
    let audio_info = probe(input)?;
    debug!(
        "{}: {:.1}s, {} Hz, {} channel(s), {:?}",
        file_name,
        audio_info.duration_secs,
        audio_info.sample_rate,
        audio_info.channels,
        audio_info.format
    );

    if cancelled.load(Ordering::Relaxed) {
        return Err(AdtrimError::Cancelled);
    }

    // Stage 2: transcription job to a terminal state.
    set_stage("transcribing");
    let job = transcriber.submit(input).await?;
    info!("{}: transcription job {} submitted", file_name, job.id);
    let segments = transcriber.await_result(&job, cancelled.clone()).await?;
    info!("{}: {} transcript segments", file_name, segments.len());

    if cancelled.load(Ordering::Relaxed) {
        return Err(AdtrimError::Cancelled);
    }

    // Stage 3: ad classification.
    set_stage("classifying ads");
    let ad_intervals = classifier.classify(&segments).await?;
    info!("{}: classifier returned {} intervals", file_name, ad_intervals.len());

    if cancelled.load(Ordering::Relaxed) {
        return Err(AdtrimError::Cancelled);
    }

    // Stage 4: complement of the ad coverage.
    let result = complement(audio_info.duration_secs, &ad_intervals);
    if result.dropped_invalid > 0 {
        warn!(
            "{}: dropped {} malformed ad interval(s)",
            file_name, result.dropped_invalid
        );
    }
    match result.outcome {
        ComplementOutcome::NoAds => info!("{}: no ads found", file_name),
        ComplementOutcome::Trimmed => info!(
            "{}: removing {:.1}s across {} ad run(s)",
            file_name,
            result.removed_duration(),
            result.ad_runs.len()
        ),
        ComplementOutcome::FullyAdCovered => warn!(
            "{}: ads cover the entire track; output will be empty",
            file_name
        ),
    }

    // Stage 5: splice the retained intervals.
    set_stage("splicing audio");
    let output_path = derive_output_path(input, pipeline_config.output_dir.as_deref());
    let splice_stats = splice(input, &audio_info, &result.retained, &output_path)?;

    info!(
        "{}: wrote {:.1}s to {}",
        file_name,
        splice_stats.output_duration_secs,
        output_path.display()
    );

    Ok(FileReport {
        input: input.to_path_buf(),
        output_path,
        outcome: result.outcome,
        ad_runs: result.ad_runs.len(),
        removed_secs: result.removed_duration(),
        original_secs: audio_info.duration_secs,
        output_secs: splice_stats.output_duration_secs,
        transcript_segments: segments.len(),
        total_time: start_time.elapsed(),
    })
}

/// Process a set of files with bounded concurrency. Each file's pipeline
/// is independent; a failure is recorded in its outcome and the remaining
/// files keep going.
pub async fn process_files(
    inputs: &[PathBuf],
    config: &Config,
    pipeline_config: &PipelineConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<Vec<FileOutcome>> {
    let transcriber: Arc<dyn Transcriber> = Arc::from(create_transcriber(config)?);
    let classifier: Arc<dyn AdClassifier> = Arc::from(create_classifier(config)?);

    let multi_progress = if pipeline_config.show_progress {
        Some(MultiProgress::new())
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut futures = FuturesUnordered::new();

    for (index, input) in inputs.iter().enumerate() {
        let sem = semaphore.clone();
        let transcriber = transcriber.clone();
        let classifier = classifier.clone();
        let pipeline_config = pipeline_config.clone();
        let cancelled = cancelled.clone();
        let input = input.clone();

        let progress_bar = multi_progress.as_ref().map(|mp| {
            let pb = mp.add(ProgressBar::new_spinner());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        futures.push(async move {
            let _permit = sem.acquire().await.expect("Semaphore closed");

            let result = process_file(
                &input,
                transcriber.as_ref(),
                classifier.as_ref(),
                &pipeline_config,
                cancelled,
                progress_bar.as_ref(),
            )
            .await;

            if let Some(pb) = progress_bar {
                match &result {
                    Ok(report) => pb.finish_with_message(format!(
                        "✓ {} (removed {:.1}s)",
                        input.display(),
                        report.removed_secs
                    )),
                    Err(e) => pb.finish_with_message(format!("✗ {}: {}", input.display(), e)),
                }
            }

            if let Err(ref e) = result {
                warn!("{}: failed: {}", input.display(), e);
            }

            (index, FileOutcome { input, result })
        });
    }

    let mut outcomes: Vec<(usize, FileOutcome)> = Vec::with_capacity(inputs.len());
    while let Some(outcome) = futures.next().await {
        outcomes.push(outcome);
    }

    // Restore input order regardless of completion order.
    outcomes.sort_by_key(|(index, _)| *index);

    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Print a summary of a multi-file run.
pub fn print_summary(outcomes: &[FileOutcome]) {
    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let failed = outcomes.len() - succeeded;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Ad Trimming Complete                      ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Files:      {} processed, {} failed", succeeded, failed);
    println!();

    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                let label = match report.outcome {
                    ComplementOutcome::NoAds => "no ads found".to_string(),
                    ComplementOutcome::Trimmed => format!(
                        "removed {:.1}s in {} ad run(s)",
                        report.removed_secs, report.ad_runs
                    ),
                    ComplementOutcome::FullyAdCovered => {
                        "entire track was ad content".to_string()
                    }
                };
                println!("  ✓ {}", outcome.input.display());
                println!(
                    "      {} ({:.1}s -> {:.1}s, {:.1}s elapsed)",
                    label,
                    report.original_secs,
                    report.output_secs,
                    report.total_time.as_secs_f64()
                );
                println!("      wrote {}", report.output_path.display());
            }
            Err(e) => {
                println!("  ✗ {}", outcome.input.display());
                println!("      {}", e);
            }
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
