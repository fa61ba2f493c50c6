pub mod fireworks;

pub use fireworks::FireworksClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// A timed chunk of speech-to-text output.
///
/// Upstream ordering by `start` is expected but not guaranteed; consumers
/// must not assume sortedness.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// State of an asynchronous transcription job.
///
/// `Completed` and `Failed` are terminal; a job is never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Handle to a submitted transcription job.
#[derive(Debug, Clone)]
pub struct TranscriptionJob {
    pub id: String,
    pub state: JobState,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Submit an audio file for transcription.
    async fn submit(&self, audio: &Path) -> Result<TranscriptionJob>;

    /// Poll a job to a terminal state and return its segments.
    ///
    /// Must enforce a bounded number of polls; a stuck job yields
    /// `JobTimeout`, never an infinite loop. The cancellation flag is
    /// checked between polls.
    async fn await_result(
        &self,
        job: &TranscriptionJob,
        cancelled: Arc<AtomicBool>,
    ) -> Result<Vec<TranscriptSegment>>;

    fn name(&self) -> &'static str;
}
