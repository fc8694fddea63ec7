//! FFmpeg/FFprobe command helpers.
//!
//! Thin async wrappers around the `ffprobe` and `ffmpeg` binaries plus the
//! parsers that turn ffprobe's JSON into [`VideoMetadata`].

use std::ffi::OsStr;
use std::process::Stdio;

use serde::Deserialize;

use crate::types::VideoMetadata;

/// Error type for FFmpeg/FFprobe invocations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary could not be started: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("no video stream found")]
    NoVideoStream,
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run `ffprobe` on `input` (a path or URL) and parse its JSON output.
pub async fn probe(ffprobe_bin: &OsStr, input: &str) -> Result<FfprobeOutput, FfmpegError> {
    let output = tokio::process::Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(input)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    serde_json::from_slice::<FfprobeOutput>(&output.stdout)
        .map_err(|e| FfmpegError::ParseError(e.to_string()))
}

/// Decode the single frame at `position_secs` and return it PNG-encoded.
///
/// Seeking happens before `-i`, which ffmpeg performs frame-accurately by
/// decoding forward from the previous keyframe. An empty result means the
/// seek landed past the last frame.
pub async fn extract_frame_png(
    ffmpeg_bin: &OsStr,
    input: &str,
    position_secs: f64,
) -> Result<Vec<u8>, FfmpegError> {
    let output = tokio::process::Command::new(ffmpeg_bin)
        .args([
            "-v",
            "error",
            "-nostdin",
            "-ss",
            &format!("{position_secs:.6}"),
            "-i",
        ])
        .arg(input)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() && output.stdout.is_empty() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    match s.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().unwrap_or(0.0);
            let den = den.trim().parse::<f64>().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => s.trim().parse::<f64>().unwrap_or(0.0),
    }
}

/// Video frame rate, preferring `r_frame_rate` and falling back to
/// `avg_frame_rate`. `0.0` when neither is usable.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    let Some(stream) = first_video_stream(probe) else {
        return 0.0;
    };
    [&stream.r_frame_rate, &stream.avg_frame_rate]
        .into_iter()
        .filter_map(|r| r.as_deref())
        .map(parse_fraction)
        .find(|fps| *fps > 0.0)
        .unwrap_or(0.0)
}

/// Duration in seconds: format-level first, then the video stream.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    let from_format = probe.format.duration.as_deref();
    let from_stream = first_video_stream(probe).and_then(|s| s.duration.as_deref());
    [from_format, from_stream]
        .into_iter()
        .flatten()
        .filter_map(|d| d.parse::<f64>().ok())
        .find(|secs| *secs > 0.0)
        .unwrap_or(0.0)
}

/// Total frame count from `nb_frames`, or estimated as duration × fps.
pub fn parse_total_frames(probe: &FfprobeOutput) -> u64 {
    let counted = first_video_stream(probe)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|nb| nb.parse::<u64>().ok())
        .filter(|n| *n > 0);
    if let Some(n) = counted {
        return n;
    }
    let duration = parse_duration(probe);
    let fps = parse_framerate(probe);
    if duration > 0.0 && fps > 0.0 {
        return (duration * fps).round() as u64;
    }
    0
}

/// First video stream's resolution, `(0, 0)` when unknown.
pub fn parse_resolution(probe: &FfprobeOutput) -> (u32, u32) {
    first_video_stream(probe)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}

/// Collapse probe output into the metadata the pipeline needs.
pub fn video_metadata(probe: &FfprobeOutput) -> Result<VideoMetadata, FfmpegError> {
    if first_video_stream(probe).is_none() {
        return Err(FfmpegError::NoVideoStream);
    }
    let (source_width, source_height) = parse_resolution(probe);
    Ok(VideoMetadata {
        frame_count: parse_total_frames(probe),
        fps: parse_framerate(probe),
        source_width,
        source_height,
    })
}
