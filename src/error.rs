use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdtrimError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transcription job failed: {0}")]
    JobFailed(String),

    #[error("Transcription job did not complete within {attempts} poll attempts")]
    JobTimeout { attempts: u32 },

    #[error("Malformed classifier output: {0}")]
    MalformedClassifierOutput(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio splicing failed: {0}")]
    Splice(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AdtrimError {
    fn from(e: reqwest::Error) -> Self {
        AdtrimError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdtrimError>;
