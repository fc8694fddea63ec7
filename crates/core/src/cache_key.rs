//! Cache key derivation.
//!
//! A key is `YYYY/MM/DD/<digest>_<w>_<h>_<t>.<ext>` where `digest` is the
//! first 128 bits of the SHA-256 of the source URI (hex), `w`/`h` are the
//! requested (unclamped) dimensions and `t` is the timestamp rounded to the
//! nearest millisecond. The date prefix is the day the key was derived, so
//! the same request on another day lands in a different bucket.

use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};

use crate::types::{OutputFormat, ThumbnailRequest};

/// Number of digest bytes kept in the key.
const DIGEST_BYTES: usize = 16;

/// Address of one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub date: NaiveDate,
    pub digest: String,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub format: OutputFormat,
}

impl CacheKey {
    /// Derive the key for `request` bucketed under `date`.
    pub fn derive(request: &ThumbnailRequest, format: OutputFormat, date: NaiveDate) -> Self {
        Self {
            date,
            digest: uri_digest(&request.source_uri),
            width: request.width,
            height: request.height,
            timestamp_ms: request.timestamp_ms.max(0.0).round() as u64,
            format,
        }
    }

    /// `<digest>_<w>_<h>_<t>.<ext>`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.digest,
            self.width,
            self.height,
            self.timestamp_ms,
            self.format.extension()
        )
    }

    /// `YYYY/MM/DD`
    pub fn date_dir(&self) -> PathBuf {
        PathBuf::from(format!("{:04}", self.date.year()))
            .join(format!("{:02}", self.date.month()))
            .join(format!("{:02}", self.date.day()))
    }

    /// Path of the artifact relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        self.date_dir().join(self.file_name())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02}/{}",
            self.date.year(),
            self.date.month(),
            self.date.day(),
            self.file_name()
        )
    }
}

/// Truncated SHA-256 hex digest of a source URI.
pub fn uri_digest(uri: &str) -> String {
    let hash = Sha256::digest(uri.as_bytes());
    hash[..DIGEST_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
