//! Video sources: probing metadata and decoding single frames.

use std::ffi::OsString;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::ThumbError;
use crate::ffmpeg::{self, FfmpegError};
use crate::types::VideoMetadata;

/// Decoding capability the pipeline depends on.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Open `uri` and read its frame count, rate and dimensions.
    async fn probe(&self, uri: &str) -> Result<VideoMetadata, ThumbError>;

    /// Seek to `frame_index` and decode exactly one frame.
    ///
    /// `Ok(None)` means the seek produced nothing, typically because the
    /// index lies past the end of the clip.
    async fn decode_frame(
        &self,
        uri: &str,
        frame_index: u64,
        metadata: &VideoMetadata,
    ) -> Result<Option<DynamicImage>, ThumbError>;
}

/// [`VideoSource`] backed by the `ffprobe`/`ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegSource {
    ffmpeg_bin: OsString,
    ffprobe_bin: OsString,
}

impl Default for FfmpegSource {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegSource {
    pub fn new(ffmpeg_bin: impl Into<OsString>, ffprobe_bin: impl Into<OsString>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

/// Anything with a `scheme://` prefix is handed to ffmpeg as-is.
fn is_remote(uri: &str) -> bool {
    uri.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn unreadable(uri: &str, err: impl ToString) -> ThumbError {
    ThumbError::SourceUnreadable {
        uri: uri.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl VideoSource for FfmpegSource {
    async fn probe(&self, uri: &str) -> Result<VideoMetadata, ThumbError> {
        if !is_remote(uri) {
            let is_file = tokio::fs::metadata(uri)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(unreadable(uri, "no such file"));
            }
        }

        let output = ffmpeg::probe(&self.ffprobe_bin, uri)
            .await
            .map_err(|e| unreadable(uri, e))?;
        ffmpeg::video_metadata(&output).map_err(|e| unreadable(uri, e))
    }

    async fn decode_frame(
        &self,
        uri: &str,
        frame_index: u64,
        metadata: &VideoMetadata,
    ) -> Result<Option<DynamicImage>, ThumbError> {
        let position_secs = frame_index as f64 / metadata.fps;

        let png = match ffmpeg::extract_frame_png(&self.ffmpeg_bin, uri, position_secs).await {
            Ok(png) => png,
            Err(FfmpegError::NotFound(e)) => return Err(unreadable(uri, e)),
            Err(e) => {
                tracing::debug!(uri, frame_index, error = %e, "ffmpeg produced no frame");
                return Ok(None);
            }
        };

        if png.is_empty() {
            return Ok(None);
        }

        match image::load_from_memory_with_format(&png, image::ImageFormat::Png) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                tracing::debug!(uri, frame_index, error = %e, "undecodable frame");
                Ok(None)
            }
        }
    }
}
