use crate::error::{AdtrimError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Fireworks-style transcription endpoint.
pub const DEFAULT_TRANSCRIPTION_URL: &str =
    "https://audio-prod.us-virginia-1.direct.fireworks.ai/v1/audio/transcriptions";

/// Default OpenAI-compatible chat completions endpoint for the classifier.
pub const DEFAULT_CLASSIFIER_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default classifier model.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the transcription service.
    pub fireworks_api_key: Option<String>,
    /// API key for the classifier service.
    pub openai_api_key: Option<String>,
    /// Transcription service base endpoint.
    pub transcription_url: String,
    /// Classifier chat completions endpoint.
    pub classifier_url: String,
    /// Classifier model name.
    pub classifier_model: String,
    /// Source language code passed to the transcription service.
    pub language: String,
    /// Seconds between transcription job polls.
    pub poll_interval_secs: u64,
    /// Upper bound on poll attempts before giving up on a job.
    pub max_poll_attempts: u32,
    /// Number of files processed concurrently.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fireworks_api_key: None,
            openai_api_key: None,
            transcription_url: DEFAULT_TRANSCRIPTION_URL.to_string(),
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            language: "en".to_string(),
            poll_interval_secs: 10,
            max_poll_attempts: 60,
            concurrency: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("FIREWORKS_API_KEY") {
            config.fireworks_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ADTRIM_TRANSCRIPTION_URL") {
            config.transcription_url = url;
        }
        if let Ok(url) = std::env::var("ADTRIM_CLASSIFIER_URL") {
            config.classifier_url = url;
        }
        if let Ok(model) = std::env::var("ADTRIM_CLASSIFIER_MODEL") {
            config.classifier_model = model;
        }
        if let Ok(interval) = std::env::var("ADTRIM_POLL_INTERVAL_SECS") {
            if let Ok(i) = interval.parse() {
                config.poll_interval_secs = i;
            }
        }
        if let Ok(attempts) = std::env::var("ADTRIM_MAX_POLL_ATTEMPTS") {
            if let Ok(a) = attempts.parse() {
                config.max_poll_attempts = a;
            }
        }
        if let Ok(concurrency) = std::env::var("ADTRIM_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.concurrency = c;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fireworks_api_key.is_none() {
            return Err(AdtrimError::Config(
                "FIREWORKS_API_KEY not set. Export it with: export FIREWORKS_API_KEY=fw-..."
                    .to_string(),
            ));
        }

        if self.openai_api_key.is_none() {
            return Err(AdtrimError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        if self.max_poll_attempts == 0 {
            return Err(AdtrimError::Config(
                "Max poll attempts must be greater than 0".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(AdtrimError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("adtrim").join("config.toml"))
    }
}
