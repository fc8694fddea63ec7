//! Resampling and encoding of decoded frames.

use std::io::Cursor;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::ThumbError;
use crate::types::OutputFormat;

/// Resize `frame` to exactly `width`×`height` with a Lanczos3 kernel.
///
/// Frames already at the target size are returned untouched.
pub fn resize(frame: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if frame.width() == width && frame.height() == height {
        return frame;
    }
    frame.resize_exact(width, height, FilterType::Lanczos3)
}

/// Serialize `image` in `format`.
pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ThumbError> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        // JPEG has no alpha channel.
        OutputFormat::Jpeg => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut buf, format.image_format())
        }
        OutputFormat::Png => image.write_to(&mut buf, format.image_format()),
    };
    result.map_err(|e| ThumbError::EncodingFailed(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Resize then encode; runs on a blocking thread in the pipeline.
pub fn render(
    frame: DynamicImage,
    width: u32,
    height: u32,
    format: OutputFormat,
) -> Result<Vec<u8>, ThumbError> {
    let resized = resize(frame, width, height);
    encode(&resized, format)
}
