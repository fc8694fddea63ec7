//! Request-to-artifact pipeline.
//!
//! ```text
//! key derived ─► cache checked ─┬─► hit ─► served from cache
//!                               └─► miss ─► lock key ─► re-check ─┬─► hit
//!                                                                 └─► probe ─► locate
//!                                   ─► decode ─► resize ─► encode ─► persist ─► served
//! ```
//!
//! Every stage failure except persistence is terminal and single-shot.
//! Persistence failures are logged and the rendered image is still served.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::DynamicImage;

use crate::cache::ArtifactCache;
use crate::cache_key::CacheKey;
use crate::clock::{Clock, SystemClock};
use crate::error::ThumbError;
use crate::frame_locator;
use crate::locks::KeyLocks;
use crate::render;
use crate::source::VideoSource;
use crate::types::{content_type_for_extension, OutputFormat, ThumbnailRequest, VideoMetadata};

/// Default bound on one miss-path production.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(20);

/// Tunables for [`Thumbnailer`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub format: OutputFormat,
    /// Upper bound on probe + decode + render for one request.
    pub deadline: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }
}

/// Where the served bytes came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    Cache {
        modified: Option<DateTime<Utc>>,
    },
    Rendered {
        frame_index: u64,
        width: u32,
        height: u32,
        /// Whether write-through to the cache succeeded.
        persisted: bool,
    },
}

/// Result handed to the HTTP boundary.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub key: CacheKey,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub origin: Origin,
}

impl Thumbnail {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.origin, Origin::Cache { .. })
    }
}

/// Orchestrates cache lookup and, on a miss, frame production.
pub struct Thumbnailer {
    source: Arc<dyn VideoSource>,
    cache: Arc<dyn ArtifactCache>,
    clock: Arc<dyn Clock>,
    locks: KeyLocks,
    options: PipelineOptions,
}

impl Thumbnailer {
    pub fn new(
        source: Arc<dyn VideoSource>,
        cache: Arc<dyn ArtifactCache>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            cache,
            clock: Arc::new(SystemClock),
            locks: KeyLocks::new(),
            options,
        }
    }

    /// Replace the calendar used for cache date buckets.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cache key `request` maps to today.
    pub fn key_for(&self, request: &ThumbnailRequest) -> CacheKey {
        CacheKey::derive(request, self.options.format, self.clock.today())
    }

    /// Serve `request` from the cache, producing and persisting it first
    /// when absent.
    pub async fn serve(&self, request: &ThumbnailRequest) -> Result<Thumbnail, ThumbError> {
        let key = self.key_for(request);
        tracing::info!(
            uri = %request.source_uri,
            width = request.width,
            height = request.height,
            timestamp_ms = request.timestamp_ms,
            key = %key,
            "Thumbnail requested"
        );

        if let Some(hit) = self.lookup(&key).await? {
            return Ok(hit);
        }

        // Serialize producers of the same key; whoever waited re-checks.
        let _guard = self.locks.acquire(&key.to_string()).await;
        if let Some(hit) = self.lookup(&key).await? {
            return Ok(hit);
        }

        tracing::debug!(key = %key, "Cache miss");
        let produced = tokio::time::timeout(self.options.deadline, self.produce(request))
            .await
            .map_err(|_| ThumbError::DeadlineExceeded(self.options.deadline))??;

        let persisted = match self.persist(&key, &produced.bytes).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Failed to cache thumbnail, serving uncached"
                );
                false
            }
        };

        Ok(Thumbnail {
            key,
            bytes: produced.bytes,
            content_type: self.options.format.content_type(),
            origin: Origin::Rendered {
                frame_index: produced.frame_index,
                width: produced.width,
                height: produced.height,
                persisted,
            },
        })
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<Thumbnail>, ThumbError> {
        if !self.cache.exists(key).await {
            return Ok(None);
        }
        let artifact = self.cache.read(key).await?;
        tracing::info!(key = %key, bytes = artifact.bytes.len(), "Serving cached thumbnail");
        Ok(Some(Thumbnail {
            key: key.clone(),
            bytes: artifact.bytes,
            content_type: content_type_for_extension(&key.file_name()),
            origin: Origin::Cache {
                modified: artifact.modified,
            },
        }))
    }

    /// Probe, locate, decode, resize and encode.
    async fn produce(&self, request: &ThumbnailRequest) -> Result<Produced, ThumbError> {
        let uri = request.source_uri.as_str();
        let metadata = self.source.probe(uri).await?;

        let frame_index = frame_locator::locate(&metadata, request.timestamp_ms)?;
        let (width, height) =
            frame_locator::clamp_dimensions(request.width, request.height, &metadata);
        tracing::debug!(
            uri,
            frame_index,
            frame_count = metadata.frame_count,
            fps = metadata.fps,
            width,
            height,
            "Located frame"
        );

        let frame = self
            .source
            .decode_frame(uri, frame_index, &metadata)
            .await?
            .ok_or_else(|| frame_unavailable(&metadata, request.timestamp_ms))?;

        let bytes = render_blocking(frame, width, height, self.options.format).await?;

        Ok(Produced {
            bytes,
            frame_index,
            width,
            height,
        })
    }

    async fn persist(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), ThumbError> {
        let as_persist_error = |e: ThumbError| ThumbError::CachePersistFailed {
            path: key.to_string(),
            reason: e.to_string(),
        };
        self.cache.ensure_dir(key).await.map_err(as_persist_error)?;
        self.cache.write(key, bytes).await.map_err(as_persist_error)
    }
}

struct Produced {
    bytes: Vec<u8>,
    frame_index: u64,
    width: u32,
    height: u32,
}

fn frame_unavailable(metadata: &VideoMetadata, requested_ms: f64) -> ThumbError {
    ThumbError::FrameUnavailable {
        // Only reachable after `locate` has validated the metadata.
        duration_ms: frame_locator::duration_ms(metadata).unwrap_or(0.0),
        requested_ms,
    }
}

async fn render_blocking(
    frame: DynamicImage,
    width: u32,
    height: u32,
    format: OutputFormat,
) -> Result<Vec<u8>, ThumbError> {
    tokio::task::spawn_blocking(move || render::render(frame, width, height, format))
        .await
        .map_err(|e| ThumbError::EncodingFailed(format!("render task failed: {e}")))?
}
