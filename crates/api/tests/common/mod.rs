#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, RgbImage};
use tower::ServiceExt;

use vthumb_api::config::ServerConfig;
use vthumb_api::router::build_app_router;
use vthumb_api::state::AppState;
use vthumb_core::cache::FsArtifactCache;
use vthumb_core::error::ThumbError;
use vthumb_core::pipeline::{PipelineOptions, Thumbnailer};
use vthumb_core::source::VideoSource;
use vthumb_core::types::{OutputFormat, VideoMetadata};

/// Source serving a 12.345 s clip (370 frames at 30 fps, 160x90) and
/// counting decodes. URIs starting with `missing` are unreadable and
/// `broken` reports zero fps.
pub struct FakeSource {
    pub decodes: AtomicUsize,
}

impl FakeSource {
    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

pub const CLIP: VideoMetadata = VideoMetadata {
    frame_count: 370,
    fps: 30.0,
    source_width: 160,
    source_height: 90,
};

#[async_trait]
impl VideoSource for FakeSource {
    async fn probe(&self, uri: &str) -> Result<VideoMetadata, ThumbError> {
        if uri.starts_with("missing") {
            return Err(ThumbError::SourceUnreadable {
                uri: uri.to_string(),
                reason: "no such file".into(),
            });
        }
        if uri.starts_with("broken") {
            return Ok(VideoMetadata { fps: 0.0, ..CLIP });
        }
        Ok(CLIP)
    }

    async fn decode_frame(
        &self,
        _uri: &str,
        frame_index: u64,
        metadata: &VideoMetadata,
    ) -> Result<Option<DynamicImage>, ThumbError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if frame_index >= metadata.frame_count {
            return Ok(None);
        }
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            metadata.source_width,
            metadata.source_height,
            image::Rgb([10, (frame_index % 256) as u8, 30]),
        ))))
    }
}

/// Build a test `ServerConfig` pointing the cache at `cache_dir`.
pub fn test_config(cache_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cache_dir: cache_dir.to_path_buf(),
        format: OutputFormat::Png,
        ffmpeg_bin: "ffmpeg".to_string(),
        ffprobe_bin: "ffprobe".to_string(),
        decode_timeout_secs: 5,
        request_timeout_secs: 30,
        cors_origins: vec!["http://localhost:5173".to_string()],
    }
}

/// Build the full application router over a [`FakeSource`].
///
/// Goes through [`build_app_router`] so tests exercise the production
/// middleware stack.
pub fn build_test_app(cache_dir: &Path) -> (Router, Arc<FakeSource>) {
    let config = test_config(cache_dir);
    let source = Arc::new(FakeSource {
        decodes: AtomicUsize::new(0),
    });
    let cache = Arc::new(FsArtifactCache::new(&config.cache_dir));
    let thumbnailer = Thumbnailer::new(
        source.clone(),
        cache.clone(),
        PipelineOptions {
            format: config.format,
            deadline: Duration::from_secs(config.decode_timeout_secs),
        },
    );

    let state = AppState {
        cache,
        thumbnailer: Arc::new(thumbnailer),
    };

    (build_app_router(state, &config), source)
}

/// Send a GET request with optional extra headers.
pub async fn get_with(app: Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    get_with(app, uri, &[]).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
