//! Video thumbnail domain logic.
//!
//! Everything between a parsed `/thumb` request and the image bytes handed
//! back to the HTTP layer lives here: cache key derivation, the filesystem
//! artifact cache, frame location, ffmpeg-backed decoding and the pipeline
//! that ties them together. Nothing in this crate knows about HTTP.

pub mod cache;
pub mod cache_key;
pub mod clock;
pub mod error;
pub mod ffmpeg;
pub mod frame_locator;
pub mod locks;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod types;
