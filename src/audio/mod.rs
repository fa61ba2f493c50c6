pub mod probe;
pub mod splice;

pub use probe::{check_ffmpeg, check_ffprobe, probe};
pub use splice::{splice, SpliceStats};

use crate::error::{AdtrimError, Result};
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension of output files.
pub const OUTPUT_SUFFIX: &str = "(trimmed-ads)";

/// Audio container formats the splicer handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    M4a,
    Aac,
    Flac,
    Ogg,
    Opus,
}

impl AudioFormat {
    /// Determine the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "aac" => Ok(AudioFormat::Aac),
            "flac" => Ok(AudioFormat::Flac),
            "ogg" => Ok(AudioFormat::Ogg),
            "opus" => Ok(AudioFormat::Opus),
            _ => Err(AdtrimError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
        }
    }

    /// WAV is spliced sample-accurately in process; everything else goes
    /// through ffmpeg stream copies.
    pub fn is_wav(&self) -> bool {
        matches!(self, AudioFormat::Wav)
    }
}

/// Metadata about an audio file.
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
}

/// Derive the output path: original stem plus the trimmed-ads suffix,
/// keeping the original extension, next to the input unless an output
/// directory is given.
pub fn derive_output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();

    let file_name = if ext.is_empty() {
        format!("{stem}{OUTPUT_SUFFIX}")
    } else {
        format!("{stem}{OUTPUT_SUFFIX}.{ext}")
    };

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}
