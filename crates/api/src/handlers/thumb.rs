//! Handler for `GET /thumb`.
//!
//! Query parameters are parsed leniently: `w`/`h` that are not unsigned
//! integers become `0` (source size) and a `t` that is not a finite number
//! becomes `1000` ms. Only a missing `url` is rejected.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use vthumb_core::error::ThumbError;
use vthumb_core::pipeline::{Origin, Thumbnail};
use vthumb_core::types::ThumbnailRequest;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Freshly rendered responses must not be cached downstream.
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Raw `/thumb` query. Everything is kept as text so bad numbers fall back
/// to defaults instead of rejecting the request.
#[derive(Debug, Default)]
pub struct ThumbParams {
    pub url: Option<String>,
    pub w: Option<String>,
    pub h: Option<String>,
    pub t: Option<String>,
}

impl ThumbParams {
    /// Collect known keys from decoded query pairs. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "url" => &mut params.url,
                "w" => &mut params.w,
                "h" => &mut params.h,
                "t" => &mut params.t,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    /// Normalize into a pipeline request.
    pub fn into_request(self) -> Result<ThumbnailRequest, ThumbError> {
        let dimension =
            |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<u32>().ok());
        let timestamp = self.t.as_deref().and_then(|s| s.trim().parse::<f64>().ok());
        ThumbnailRequest::normalized(
            self.url.as_deref(),
            dimension(&self.w),
            dimension(&self.h),
            timestamp,
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format a timestamp as an HTTP-date (RFC 7231 IMF-fixdate).
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Strong validator for a cached artifact. Artifacts never change once
/// written, so the full key (date bucket included) identifies the content.
fn etag_for(thumb: &Thumbnail) -> String {
    format!("\"{}\"", thumb.key)
}

/// Whether an `If-None-Match` header matches `etag`.
fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|tag| tag.trim().trim_start_matches("W/"))
        .any(|tag| tag == "*" || tag == etag)
}

fn insert_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

fn cached_response(
    thumb: Thumbnail,
    modified: Option<DateTime<Utc>>,
    request: &HeaderMap,
) -> Response {
    let etag = etag_for(&thumb);
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, header::ETAG, &etag);
    if let Some(modified) = modified {
        insert_header(&mut headers, header::LAST_MODIFIED, &http_date(modified));
    }

    if if_none_match(request, &etag) {
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(thumb.content_type));
    (StatusCode::OK, headers, thumb.bytes).into_response()
}

fn rendered_response(thumb: Thumbnail) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(thumb.content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    (StatusCode::OK, headers, thumb.bytes).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /thumb?url=<source>&w=<px>&h=<px>&t=<ms>
///
/// Serves the cached artifact when one exists for today's key, otherwise
/// extracts, resizes and caches the frame before returning it.
pub async fn get_thumb(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Response> {
    let Query(pairs) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = ThumbParams::from_pairs(pairs).into_request()?;

    let thumb = state.thumbnailer.serve(&request).await?;

    Ok(match thumb.origin.clone() {
        Origin::Cache { modified } => cached_response(thumb, modified, &headers),
        Origin::Rendered { .. } => rendered_response(thumb),
    })
}
