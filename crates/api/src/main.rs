use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vthumb_api::config::ServerConfig;
use vthumb_api::router::build_app_router;
use vthumb_api::state::AppState;
use vthumb_core::cache::FsArtifactCache;
use vthumb_core::pipeline::{PipelineOptions, Thumbnailer};
use vthumb_core::source::FfmpegSource;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vthumb_api=debug,vthumb_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        cache_dir = %config.cache_dir.display(),
        format = ?config.format,
        "Loaded server configuration"
    );

    // --- Cache ---
    let cache = Arc::new(FsArtifactCache::new(&config.cache_dir));
    if let Err(e) = tokio::fs::create_dir_all(cache.root()).await {
        // Not fatal: thumbnails are still served, just never cached.
        tracing::warn!(error = %e, "Cache root could not be created");
    }

    // --- Pipeline ---
    let source = Arc::new(FfmpegSource::new(&config.ffmpeg_bin, &config.ffprobe_bin));
    let thumbnailer = Thumbnailer::new(
        source,
        cache.clone(),
        PipelineOptions {
            format: config.format,
            deadline: Duration::from_secs(config.decode_timeout_secs),
        },
    );

    // --- App state ---
    let state = AppState {
        cache,
        thumbnailer: Arc::new(thumbnailer),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
