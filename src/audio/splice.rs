//! Audio splicer: concatenates retained intervals into a new file.
//!
//! WAV input is spliced sample-accurately with hound. Compressed
//! containers are cut with ffmpeg stream copies and rejoined with the
//! concat demuxer, so retained samples are never re-encoded; cuts land on
//! packet boundaries and a small click at a cut is accepted behavior.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{AdtrimError, Result};
use crate::timeline::TimeInterval;

use super::probe::check_ffmpeg;
use super::AudioInfo;

/// What the splicer produced.
#[derive(Debug, Clone)]
pub struct SpliceStats {
    /// Number of retained segments written.
    pub segments: usize,
    /// Duration of the output artifact in seconds.
    pub output_duration_secs: f64,
}

/// Splice the retained intervals of `input` into `output`, in order,
/// preserving sample rate, channel count, and container format.
///
/// An empty retained list produces a valid minimal artifact (a zero-frame
/// WAV, or a tenth of a second of silence for compressed formats).
pub fn splice(
    input: &Path,
    audio_info: &AudioInfo,
    retained: &[TimeInterval],
    output: &Path,
) -> Result<SpliceStats> {
    if !input.exists() {
        return Err(AdtrimError::FileNotFound(input.display().to_string()));
    }

    if audio_info.format.is_wav() {
        splice_wav(input, retained, output)
    } else {
        splice_stream_copy(input, audio_info, retained, output)
    }
}

fn splice_wav(input: &Path, retained: &[TimeInterval], output: &Path) -> Result<SpliceStats> {
    let mut reader = WavReader::open(input)
        .map_err(|e| AdtrimError::Splice(format!("Failed to open WAV file: {e}")))?;
    let spec = reader.spec();

    match spec.sample_format {
        SampleFormat::Int => copy_wav_frames::<i32>(&mut reader, spec, retained, output),
        SampleFormat::Float => copy_wav_frames::<f32>(&mut reader, spec, retained, output),
    }
}

fn copy_wav_frames<S>(
    reader: &mut WavReader<BufReader<File>>,
    spec: WavSpec,
    retained: &[TimeInterval],
    output: &Path,
) -> Result<SpliceStats>
where
    S: hound::Sample + Copy,
{
    let total_frames = reader.duration() as u64;
    let channels = spec.channels as usize;

    let samples: Vec<S> = reader
        .samples::<S>()
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| AdtrimError::Splice(format!("Failed to read samples: {e}")))?;

    let mut writer = WavWriter::create(output, spec)
        .map_err(|e| AdtrimError::Splice(format!("Failed to create output WAV: {e}")))?;

    let mut segments = 0usize;
    let mut frames_written = 0u64;

    for interval in retained {
        let start = seconds_to_frame(interval.start, spec.sample_rate).min(total_frames);
        let end = seconds_to_frame(interval.end, spec.sample_rate).min(total_frames);
        if end <= start {
            continue;
        }

        debug!("Copying frames {}..{} ({} channels)", start, end, channels);

        for frame in start..end {
            let base = frame as usize * channels;
            for channel in 0..channels {
                writer
                    .write_sample(samples[base + channel])
                    .map_err(|e| AdtrimError::Splice(format!("Failed to write sample: {e}")))?;
            }
        }

        segments += 1;
        frames_written += end - start;
    }

    writer
        .finalize()
        .map_err(|e| AdtrimError::Splice(format!("Failed to finalize output WAV: {e}")))?;

    info!(
        "Spliced {} WAV segments ({} frames) to {}",
        segments,
        frames_written,
        output.display()
    );

    Ok(SpliceStats {
        segments,
        output_duration_secs: frames_written as f64 / spec.sample_rate as f64,
    })
}

fn seconds_to_frame(seconds: f64, sample_rate: u32) -> u64 {
    (seconds * sample_rate as f64).round().max(0.0) as u64
}

fn splice_stream_copy(
    input: &Path,
    audio_info: &AudioInfo,
    retained: &[TimeInterval],
    output: &Path,
) -> Result<SpliceStats> {
    check_ffmpeg()?;

    let retained: Vec<&TimeInterval> = retained.iter().filter(|i| i.duration() > 0.0).collect();
    if retained.is_empty() {
        return write_silence(audio_info, output);
    }

    let staging = TempDir::new()?;
    let ext = audio_info.format.extension();
    let mut concat_list = String::new();

    for (index, interval) in retained.iter().enumerate() {
        let segment_path = staging.path().join(format!("segment_{index:04}.{ext}"));

        debug!(
            "Cutting segment {}: {:.3}s for {:.3}s",
            index,
            interval.start,
            interval.duration()
        );

        let status = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error", "-ss"])
            .arg(format!("{:.3}", interval.start))
            .arg("-t")
            .arg(format!("{:.3}", interval.duration()))
            .arg("-i")
            .arg(input)
            .args(["-c", "copy"])
            .arg(&segment_path)
            .status()
            .map_err(|e| AdtrimError::Splice(format!("Failed to run FFmpeg: {e}")))?;

        if !status.success() {
            return Err(AdtrimError::Splice(format!(
                "FFmpeg segment cut failed for [{:.3}, {:.3}]",
                interval.start, interval.end
            )));
        }

        concat_list.push_str(&format!("file '{}'\n", segment_path.display()));
    }

    let list_path = staging.path().join("segments.txt");
    std::fs::write(&list_path, concat_list)?;

    let status = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy"])
        .arg(output)
        .status()
        .map_err(|e| AdtrimError::Splice(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(AdtrimError::Splice(
            "FFmpeg concat of retained segments failed".to_string(),
        ));
    }

    let output_duration_secs: f64 = retained.iter().map(|i| i.duration()).sum();

    info!(
        "Spliced {} segments ({:.1}s) to {}",
        retained.len(),
        output_duration_secs,
        output.display()
    );

    Ok(SpliceStats {
        segments: retained.len(),
        output_duration_secs,
    })
}

/// Produce a valid near-silent artifact for the nothing-retained case.
fn write_silence(audio_info: &AudioInfo, output: &Path) -> Result<SpliceStats> {
    let channel_layout = if audio_info.channels <= 1 { "mono" } else { "stereo" };
    let source = format!(
        "anullsrc=r={}:cl={}",
        audio_info.sample_rate, channel_layout
    );

    let status = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg(&source)
        .args(["-t", "0.1"])
        .arg(output)
        .status()
        .map_err(|e| AdtrimError::Splice(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(AdtrimError::Splice(
            "FFmpeg silence generation failed".to_string(),
        ));
    }

    Ok(SpliceStats {
        segments: 0,
        output_duration_secs: 0.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;

    fn write_ramp_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for frame in 0..frames {
            for _ in 0..channels {
                writer.write_sample((frame % 10_000) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn wav_info(duration_secs: f64, sample_rate: u32, channels: u16) -> AudioInfo {
        AudioInfo {
            duration_secs,
            sample_rate,
            channels,
            format: AudioFormat::Wav,
        }
    }

    #[test]
    fn test_full_timeline_splice_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp_wav(&input, 8000, 1, 8000);

        let stats = splice(
            &input,
            &wav_info(1.0, 8000, 1),
            &[TimeInterval::new(0.0, 1.0)],
            &output,
        )
        .unwrap();

        assert_eq!(stats.segments, 1);
        assert!((stats.output_duration_secs - 1.0).abs() < 1e-9);

        let reader = WavReader::open(&output).unwrap();
        assert_eq!(reader.duration(), 8000);
        assert_eq!(reader.spec().sample_rate, 8000);
    }

    #[test]
    fn test_splice_removes_middle() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp_wav(&input, 8000, 1, 8000);

        // Drop the middle half second.
        let retained = [TimeInterval::new(0.0, 0.25), TimeInterval::new(0.75, 1.0)];
        let stats = splice(&input, &wav_info(1.0, 8000, 1), &retained, &output).unwrap();

        assert_eq!(stats.segments, 2);

        let mut reader = WavReader::open(&output).unwrap();
        assert_eq!(reader.duration(), 4000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        // First retained frame is sample 0, first frame after the cut is 6000.
        assert_eq!(samples[0], 0);
        assert_eq!(samples[2000], 6000);
    }

    #[test]
    fn test_splice_preserves_channels() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp_wav(&input, 8000, 2, 4000);

        let stats = splice(
            &input,
            &wav_info(0.5, 8000, 2),
            &[TimeInterval::new(0.1, 0.3)],
            &output,
        )
        .unwrap();

        assert_eq!(stats.segments, 1);

        let reader = WavReader::open(&output).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 1600);
    }

    #[test]
    fn test_empty_retained_wav_produces_valid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp_wav(&input, 8000, 1, 8000);

        let stats = splice(&input, &wav_info(1.0, 8000, 1), &[], &output).unwrap();

        assert_eq!(stats.segments, 0);
        assert_eq!(stats.output_duration_secs, 0.0);

        let reader = WavReader::open(&output).unwrap();
        assert_eq!(reader.duration(), 0);
    }

    #[test]
    fn test_interval_past_end_is_clamped_to_frames() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp_wav(&input, 8000, 1, 8000);

        let stats = splice(
            &input,
            &wav_info(1.0, 8000, 1),
            &[TimeInterval::new(0.5, 2.0)],
            &output,
        )
        .unwrap();

        assert!((stats.output_duration_secs - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_interval_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp_wav(&input, 8000, 1, 8000);

        let stats = splice(
            &input,
            &wav_info(1.0, 8000, 1),
            &[TimeInterval::new(0.3, 0.3)],
            &output,
        )
        .unwrap();

        assert_eq!(stats.segments, 0);
        assert_eq!(stats.output_duration_secs, 0.0);
    }

    #[test]
    fn test_splice_missing_input() {
        let result = splice(
            Path::new("/nonexistent/in.wav"),
            &wav_info(1.0, 8000, 1),
            &[TimeInterval::new(0.0, 1.0)],
            Path::new("/tmp/out.wav"),
        );
        assert!(matches!(result, Err(AdtrimError::FileNotFound(_))));
    }
}
