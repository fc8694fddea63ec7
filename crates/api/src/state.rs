use std::sync::Arc;

use vthumb_core::cache::FsArtifactCache;
use vthumb_core::pipeline::Thumbnailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The cache the thumbnailer writes through to (also probed by `/health`).
    pub cache: Arc<FsArtifactCache>,
    /// Request-to-artifact pipeline.
    pub thumbnailer: Arc<Thumbnailer>,
}
