//! Request-scoped data passed between pipeline stages.

use crate::error::ThumbError;

/// Timestamp used when the request does not carry a usable `t`.
pub const DEFAULT_TIMESTAMP_MS: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A normalized thumbnail request.
///
/// `width`/`height` of `0` mean "use the source dimension". `timestamp_ms`
/// is always finite and non-negative once constructed through
/// [`ThumbnailRequest::normalized`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRequest {
    pub source_uri: String,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: f64,
}

impl ThumbnailRequest {
    /// Build a request from already-parsed query values.
    ///
    /// Absent dimensions become `0`; an absent or non-finite timestamp
    /// becomes [`DEFAULT_TIMESTAMP_MS`]; negative timestamps clamp to `0`.
    /// A missing or blank source URI is the only rejection.
    pub fn normalized(
        source_uri: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
        timestamp_ms: Option<f64>,
    ) -> Result<Self, ThumbError> {
        let source_uri = source_uri
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ThumbError::BadRequest("missing required parameter 'url'".into()))?;

        let timestamp_ms = match timestamp_ms {
            Some(t) if t.is_finite() => t.max(0.0),
            _ => DEFAULT_TIMESTAMP_MS,
        };

        Ok(Self {
            source_uri: source_uri.to_string(),
            width: width.unwrap_or(0),
            height: height.unwrap_or(0),
            timestamp_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// Source metadata
// ---------------------------------------------------------------------------

/// What the source reports about itself, read once per cache miss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub frame_count: u64,
    pub fps: f64,
    pub source_width: u32,
    pub source_height: u32,
}

// ---------------------------------------------------------------------------
// Output format
// ---------------------------------------------------------------------------

/// Encoded image format for produced thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Parse from a config value (`png`, `jpeg` or `jpg`, case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// File extension used for cache artifacts, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Guess a content type from a cache artifact's file extension.
pub fn content_type_for_extension(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
