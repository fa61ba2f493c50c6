use crate::error::{AdtrimError, Result};
use crate::transcribe::{JobState, Transcriber, TranscriptSegment, TranscriptionJob};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// Maximum file size accepted by the transcription API (1 GB).
const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Fireworks-style asynchronous transcription client.
///
/// Submission posts the audio as multipart form data and returns a job id;
/// the job is then polled at a fixed interval until it reaches a terminal
/// state or the attempt bound is exceeded.
pub struct FireworksClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl FireworksClient {
    /// Create a new client with the given API key and endpoint.
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: "en".to_string(),
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 60,
        }
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = language;
        self
    }

    /// Set the delay between job polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the upper bound on poll attempts.
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    /// Build the multipart form for job submission.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("aac") => "audio/aac",
            Some("flac") => "audio/flac",
            Some("ogg") | Some("opus") => "audio/ogg",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let form = Form::new()
            .part("file", file_part)
            .text("vad_model", "silero")
            .text("alignment_model", "tdnn_ffn")
            .text("preprocessing", "none")
            .text("language", self.language.clone())
            .text("temperature", "0.2")
            .text("timestamp_granularities", "segment")
            .text("response_format", "verbose_json");

        Ok(form)
    }

    /// Fetch the current state of a job by id.
    async fn poll_job(&self, job_id: &str) -> Result<JobPollResponse> {
        let url = format!("{}/{}", self.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        debug!("Job {} poll status: {}", job_id, status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AdtrimError::Transport(format!(
                "job poll returned {}: {}",
                status, error_body
            )));
        }

        let body = response.text().await?;
        let parsed: JobPollResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}

#[async_trait]
impl Transcriber for FireworksClient {
    async fn submit(&self, audio: &Path) -> Result<TranscriptionJob> {
        let metadata = fs::metadata(audio)
            .await
            .map_err(|_| AdtrimError::FileNotFound(audio.display().to_string()))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(AdtrimError::JobFailed(format!(
                "File too large for transcription API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        debug!("Submitting {:?} for transcription", audio);

        let form = self.build_form(audio).await?;
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AdtrimError::Transport(format!(
                "submission failed ({}): {}",
                status, error_body
            )));
        }

        let body = response.text().await?;
        let submitted: SubmitResponse = serde_json::from_str(&body)?;

        debug!("Job {} submitted (state: {:?})", submitted.id, submitted.status);

        Ok(TranscriptionJob {
            id: submitted.id,
            state: submitted.status.unwrap_or(JobState::Queued),
        })
    }

    async fn await_result(
        &self,
        job: &TranscriptionJob,
        cancelled: Arc<AtomicBool>,
    ) -> Result<Vec<TranscriptSegment>> {
        for attempt in 0..self.max_poll_attempts {
            if cancelled.load(Ordering::Relaxed) {
                return Err(AdtrimError::Cancelled);
            }

            // First poll is immediate; subsequent polls wait out the interval.
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
                if cancelled.load(Ordering::Relaxed) {
                    return Err(AdtrimError::Cancelled);
                }
            }

            let poll = self.poll_job(&job.id).await?;
            debug!("Job {} attempt {}: {:?}", job.id, attempt + 1, poll.status);

            match poll.status {
                JobState::Completed => {
                    let segments = poll.segments.unwrap_or_default();
                    if segments.is_empty() {
                        warn!("Job {} completed with no segments", job.id);
                    }
                    return Ok(segments);
                }
                JobState::Failed => {
                    return Err(AdtrimError::JobFailed(
                        poll.error
                            .unwrap_or_else(|| "job reached failed state".to_string()),
                    ));
                }
                JobState::Queued | JobState::Processing => {}
            }
        }

        Err(AdtrimError::JobTimeout {
            attempts: self.max_poll_attempts,
        })
    }

    fn name(&self) -> &'static str {
        "Fireworks"
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
    #[serde(default)]
    status: Option<JobState>,
}

#[derive(Debug, Deserialize)]
struct JobPollResponse {
    status: JobState,
    #[serde(default)]
    segments: Option<Vec<TranscriptSegment>>,
    #[serde(default)]
    error: Option<String>,
}
