use std::path::Path;
use std::process::Command;

use hound::WavReader;
use tracing::debug;

use crate::error::{AdtrimError, Result};

use super::{AudioFormat, AudioInfo};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        AdtrimError::Splice(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(AdtrimError::Splice("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe").arg("-version").output().map_err(|e| {
        AdtrimError::Splice(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(AdtrimError::Splice("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Probe an audio file for duration, sample rate, and channel count.
///
/// WAV files are read directly so they work without ffmpeg installed;
/// compressed containers go through ffprobe.
pub fn probe(input: &Path) -> Result<AudioInfo> {
    if !input.exists() {
        return Err(AdtrimError::FileNotFound(input.display().to_string()));
    }

    let format = AudioFormat::from_path(input)?;

    if format.is_wav() {
        return probe_wav(input, format);
    }

    check_ffprobe()?;
    let duration_secs = ffprobe_duration(input)?;
    let (sample_rate, channels) = ffprobe_stream_info(input)?;

    Ok(AudioInfo {
        duration_secs,
        sample_rate,
        channels,
        format,
    })
}

fn probe_wav(input: &Path, format: AudioFormat) -> Result<AudioInfo> {
    let reader = WavReader::open(input)
        .map_err(|e| AdtrimError::Splice(format!("Failed to open WAV file: {e}")))?;
    let spec = reader.spec();
    let frames = reader.duration();

    Ok(AudioInfo {
        duration_secs: frames as f64 / spec.sample_rate as f64,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        format,
    })
}

/// Get audio duration in seconds using FFprobe.
fn ffprobe_duration(input: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| AdtrimError::Splice(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AdtrimError::Splice(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str.trim().parse().map_err(|e| {
        AdtrimError::Splice(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })
}

/// Get sample rate and channel count using FFprobe.
fn ffprobe_stream_info(input: &Path) -> Result<(u32, u16)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate,channels",
            "-of",
            "csv=s=,:p=0",
        ])
        .arg(input)
        .output()
        .map_err(|e| AdtrimError::Splice(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AdtrimError::Splice(format!("FFprobe failed: {stderr}")));
    }

    let info_str = String::from_utf8_lossy(&output.stdout);
    let parts: Vec<&str> = info_str.trim().split(',').collect();

    if parts.len() < 2 {
        return Err(AdtrimError::Splice(format!(
            "Failed to parse audio info: {}",
            info_str.trim()
        )));
    }

    let sample_rate: u32 = parts[0]
        .parse()
        .map_err(|e| AdtrimError::Splice(format!("Failed to parse sample rate: {e}")))?;

    let channels: u16 = parts[1]
        .parse()
        .map_err(|e| AdtrimError::Splice(format!("Failed to parse channels: {e}")))?;

    Ok((sample_rate, channels))
}
