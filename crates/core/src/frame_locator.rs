//! Timestamp → frame index mapping and output size clamping.

use crate::error::ThumbError;
use crate::types::VideoMetadata;

/// Requested dimensions below this many pixels fall back to the source size.
pub const MIN_DIMENSION: u32 = 10;

/// Total clip length in milliseconds.
///
/// Fails with [`ThumbError::MalformedSource`] when the source reports no
/// frames or a non-positive frame rate.
pub fn duration_ms(metadata: &VideoMetadata) -> Result<f64, ThumbError> {
    let fps = metadata.fps;
    if metadata.frame_count == 0 || !fps.is_finite() || fps <= 0.0 {
        return Err(ThumbError::MalformedSource {
            frame_count: metadata.frame_count,
            fps,
        });
    }
    Ok(metadata.frame_count as f64 * 1000.0 / fps)
}

/// Frame index for `timestamp_ms`, truncated toward zero.
///
/// The result is not bounded by the frame count: a timestamp past the end
/// maps past the last frame and the decoder decides whether anything is
/// there.
pub fn locate(metadata: &VideoMetadata, timestamp_ms: f64) -> Result<u64, ThumbError> {
    let duration = duration_ms(metadata)?;
    let index = (timestamp_ms.max(0.0) / duration) * metadata.frame_count as f64;
    Ok(index as u64)
}

/// Output dimension for one axis.
fn clamp_axis(requested: u32, source: u32) -> u32 {
    if requested < MIN_DIMENSION || requested > source {
        source
    } else {
        requested
    }
}

/// Output `(width, height)`: each axis independently falls back to the
/// source size when the request is degenerate or larger than the source.
pub fn clamp_dimensions(width: u32, height: u32, metadata: &VideoMetadata) -> (u32, u32) {
    (
        clamp_axis(width, metadata.source_width),
        clamp_axis(height, metadata.source_height),
    )
}
