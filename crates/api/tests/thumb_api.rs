//! Integration tests for `GET /thumb`.

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_text, get, get_with};
use image::GenericImageView;

// ---------------------------------------------------------------------------
// Miss then hit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_request_renders_with_no_cache_headers() {
    let dir = tempfile::tempdir().unwrap();
    let (app, source) = common::build_test_app(dir.path());

    let response = get(app, "/thumb?url=clip.mp4&w=80&h=45&t=2000").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    let bytes = body_bytes(response).await;
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (80, 45));
    assert_eq!(source.decodes(), 1);
}

#[tokio::test]
async fn repeat_request_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (app, source) = common::build_test_app(dir.path());
    let uri = "/thumb?url=clip.mp4&w=80&h=45&t=2000";

    let first = body_bytes(get(app.clone(), uri).await).await;
    let response = get(app, uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    assert!(response.headers().get(header::ETAG).is_some());
    assert!(response.headers().get(header::LAST_MODIFIED).is_some());
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, first);
    assert_eq!(source.decodes(), 1);
}

#[tokio::test]
async fn matching_etag_returns_not_modified() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());
    let uri = "/thumb?url=clip.mp4&t=500";

    get(app.clone(), uri).await;
    let hit = get(app.clone(), uri).await;
    let etag = hit.headers()[header::ETAG].to_str().unwrap().to_string();

    let response = get_with(app, uri, &[("if-none-match", etag.as_str())]).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn etag_carries_the_date_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());
    let uri = "/thumb?url=clip.mp4&w=20&h=20&t=1000";

    get(app.clone(), uri).await;
    let hit = get(app, uri).await;
    let etag = hit.headers()[header::ETAG].to_str().unwrap().to_string();

    let today = chrono::Local::now().date_naive();
    let prefix = format!("\"{}/", today.format("%Y/%m/%d"));
    assert!(etag.starts_with(&prefix), "{etag}");
    assert!(etag.ends_with("_20_20_1000.png\""), "{etag}");
}

#[tokio::test]
async fn artifact_is_written_under_a_date_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());

    get(app, "/thumb?url=clip.mp4&w=20&h=20&t=1000").await;

    let today = chrono::Local::now().date_naive();
    let bucket = dir
        .path()
        .join(today.format("%Y").to_string())
        .join(today.format("%m").to_string())
        .join(today.format("%d").to_string());
    let names: Vec<String> = std::fs::read_dir(&bucket)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("_20_20_1000.png"), "{names:?}");
}

// ---------------------------------------------------------------------------
// Parameter handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unparsable_numbers_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());

    let response = get(app, "/thumb?url=clip.mp4&w=big&h=&t=later").await;

    assert_eq!(response.status(), StatusCode::OK);
    let decoded = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.dimensions(), (160, 90));
}

#[tokio::test]
async fn repeated_parameters_use_the_first_value() {
    let dir = tempfile::tempdir().unwrap();
    let (app, source) = common::build_test_app(dir.path());

    let response = get(app.clone(), "/thumb?url=clip.mp4&t=500&t=700").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/thumb?url=clip.mp4&w=40&w=abc&t=500").await;
    assert_eq!(response.status(), StatusCode::OK);
    let decoded = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.dimensions(), (40, 90));
    assert_eq!(source.decodes(), 2);
}

#[tokio::test]
async fn tiny_and_huge_sizes_clamp_to_source() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());

    for query in ["w=1&h=1", "w=3000&h=3000"] {
        let response = get(app.clone(), &format!("/thumb?url=clip.mp4&{query}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let decoded = image::load_from_memory(&body_bytes(response).await).unwrap();
        assert_eq!(decoded.dimensions(), (160, 90));
    }
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (app, source) = common::build_test_app(dir.path());

    let response = get(app, "/thumb?w=10").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("url"));
    assert_eq!(source.decodes(), 0);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timestamp_past_the_end_is_500_with_durations() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());

    let response = get(app, "/thumb?url=clip.mp4&t=50000").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        body_text(response).await,
        "this video duration is 12333.333ms, but you need 50000.000ms"
    );
}

#[tokio::test]
async fn zero_fps_source_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let (app, source) = common::build_test_app(dir.path());

    let response = get(app, "/thumb?url=broken.mp4").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("malformed video source"));
    assert_eq!(source.decodes(), 0);
}

#[tokio::test]
async fn unreadable_source_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _source) = common::build_test_app(dir.path());

    let response = get(app, "/thumb?url=missing.mp4").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "cannot read video source missing.mp4: no such file"
    );
}

#[tokio::test]
async fn unwritable_cache_still_returns_the_image() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("cache-is-a-file");
    std::fs::write(&blocker, b"").unwrap();
    let (app, source) = common::build_test_app(&blocker);

    let uri = "/thumb?url=clip.mp4&w=40&h=30";
    let first = get(app.clone(), uri).await;
    assert_eq!(first.status(), StatusCode::OK);
    let decoded = image::load_from_memory(&body_bytes(first).await).unwrap();
    assert_eq!(decoded.dimensions(), (40, 30));

    let second = get(app, uri).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(source.decodes(), 2);
}
