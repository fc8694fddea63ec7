use std::path::PathBuf;

use vthumb_core::types::OutputFormat;

/// Server configuration loaded from environment variables.
///
/// Read once at startup and passed explicitly to whatever needs it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Root directory of the thumbnail cache (default: `/tmp/thumbnails`).
    pub cache_dir: PathBuf,
    /// Encoded format of produced thumbnails (default: `png`).
    pub format: OutputFormat,
    /// `ffmpeg` binary used to decode frames.
    pub ffmpeg_bin: String,
    /// `ffprobe` binary used to read source metadata.
    pub ffprobe_bin: String,
    /// Deadline for producing one thumbnail on a cache miss (default: `20`).
    pub decode_timeout_secs: u64,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8080`                     |
    /// | `CACHE_DIR`            | `/tmp/thumbnails`          |
    /// | `THUMB_FORMAT`         | `png`                      |
    /// | `FFMPEG_BIN`           | `ffmpeg`                   |
    /// | `FFPROBE_BIN`          | `ffprobe`                  |
    /// | `DECODE_TIMEOUT_SECS`  | `20`                       |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    ///
    /// Panics on unparsable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cache_dir = std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp/thumbnails"));

        let format_name = std::env::var("THUMB_FORMAT").unwrap_or_else(|_| "png".into());
        let format = OutputFormat::from_name(&format_name)
            .unwrap_or_else(|| panic!("THUMB_FORMAT must be 'png' or 'jpeg', got '{format_name}'"));

        let ffmpeg_bin = std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".into());
        let ffprobe_bin = std::env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".into());

        let decode_timeout_secs: u64 = std::env::var("DECODE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DECODE_TIMEOUT_SECS must be a valid u64");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            cache_dir,
            format,
            ffmpeg_bin,
            ffprobe_bin,
            decode_timeout_secs,
            request_timeout_secs,
            cors_origins,
        }
    }
}
