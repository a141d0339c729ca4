//! Router-level tests against a mock origin and a copying transcoder.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use remix_api::{create_router, ApiConfig, AppState};
use remix_media::{HttpFetcher, MediaResult, Transcoder};
use remix_models::{serialize_chain, EffectCatalog, FilterDirective};
use remix_pipeline::{PipelineConfig, RemixOrchestrator};

/// Writes the input followed by the serialized chain, like a real render would
/// produce a file of comparable size.
struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, chain: &[FilterDirective], output: &Path) -> MediaResult<()> {
        let mut bytes = tokio::fs::read(input).await?;
        bytes.extend_from_slice(serialize_chain(chain).as_bytes());
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

struct TestApp {
    _dir: TempDir,
    router: Router,
    pipeline: PipelineConfig,
    orchestrator: Arc<RemixOrchestrator>,
}

async fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut pipeline = PipelineConfig::with_base_dir(dir.path());
    pipeline.staging_grace = Duration::from_millis(10);
    pipeline.ensure_dirs().await.unwrap();

    let fetcher = HttpFetcher::new(Duration::from_secs(5), 5).unwrap();
    let orchestrator = Arc::new(RemixOrchestrator::new(
        Arc::new(EffectCatalog::builtin()),
        Arc::new(fetcher),
        Arc::new(CopyTranscoder),
        pipeline.clone(),
    ));

    let state = AppState::from_parts(ApiConfig::default(), orchestrator.clone());
    TestApp {
        _dir: dir,
        router: create_router(state, None),
        pipeline,
        orchestrator,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_remix(router: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/remix")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "remix.test")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_root_lists_catalog_and_example() {
    let app = test_app().await;
    let (status, body) = get_json(&app.router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert_eq!(body["effects"].as_array().unwrap().len(), 6);
    assert_eq!(body["defaultEffect"], "youtube_slowed");
    assert!(body["example"]["audioUrl"].is_string());
    assert!(body["memory"]["systemTotalMb"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let app = test_app().await;
    let (status, body) = get_json(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].is_u64());
    assert!(body["memory"].is_object());
}

#[tokio::test]
async fn test_effects_listing_matches_catalog() {
    let app = test_app().await;
    let (status, body) = get_json(&app.router, "/effects").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<String> = body["effects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, EffectCatalog::builtin().ids());
}

#[tokio::test]
async fn test_missing_audio_url_returns_example_without_network() {
    let server = MockServer::start().await;
    let app = test_app().await;

    let (status, body) = post_remix(&app.router, json!({ "effect": "lofi" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "audioUrl is required");
    assert!(body["example"].is_object());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_effect_lists_available_and_creates_nothing() {
    let server = MockServer::start().await;
    let app = test_app().await;

    let (status, body) = post_remix(
        &app.router,
        json!({ "audioUrl": format!("{}/song.mp3", server.uri()), "effect": "dubstep" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["available"], json!(EffectCatalog::builtin().ids()));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(file_count(&app.pipeline.staging_dir), 0);
    assert_eq!(file_count(&app.pipeline.output_dir), 0);
}

#[tokio::test]
async fn test_malformed_json_returns_example() {
    let app = test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/remix")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"audioUrl\": "))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["example"].is_object());
}

#[tokio::test]
async fn test_origin_404_is_download_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    let app = test_app().await;

    let (status, body) = post_remix(
        &app.router,
        json!({ "audioUrl": format!("{}/gone.mp3", server.uri()) }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DOWNLOAD_FAILED");
    assert!(body["message"].as_str().unwrap().contains("404"));
    assert!(body["processingTime"].as_str().unwrap().ends_with('s'));
    assert!(!body["tips"].as_array().unwrap().is_empty());
    assert_eq!(file_count(&app.pipeline.staging_dir), 0);
}

#[tokio::test]
async fn test_redirect_to_non_http_scheme_is_download_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/share/song"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "ftp://files.example.com/song.mp3"),
        )
        .mount(&server)
        .await;
    let app = test_app().await;

    let (status, body) = post_remix(
        &app.router,
        json!({ "audioUrl": format!("{}/share/song", server.uri()) }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
    assert_eq!(body["code"], "DOWNLOAD_FAILED");
    assert!(body["processingTime"].is_string());
    assert!(body.get("example").is_none());
    assert_eq!(file_count(&app.pipeline.staging_dir), 0);
    assert_eq!(file_count(&app.pipeline.output_dir), 0);
}

#[tokio::test]
async fn test_presets_route_mirrors_effects() {
    let app = test_app().await;
    let (_, effects) = get_json(&app.router, "/effects").await;
    let (status, presets) = get_json(&app.router, "/presets").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(presets, effects);
}

#[tokio::test]
async fn test_tiny_body_is_rejected_as_invalid_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tiny.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
        .mount(&server)
        .await;
    let app = test_app().await;

    let (status, body) = post_remix(
        &app.router,
        json!({ "audioUrl": format!("{}/tiny.mp3", server.uri()) }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INVALID_SOURCE_FILE");
    assert_eq!(file_count(&app.pipeline.staging_dir), 0);
    assert_eq!(file_count(&app.pipeline.output_dir), 0);
}

#[tokio::test]
async fn test_redirected_source_is_remixed_and_served() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/share/song"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/files/song.mp3"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/song.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xAAu8; 8192]))
        .mount(&server)
        .await;
    let app = test_app().await;

    let (status, body) = post_remix(
        &app.router,
        json!({ "audioUrl": format!("{}/share/song", server.uri()), "effect": "vaporwave" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["effect"], "vaporwave");
    assert!(body["fileSize"].as_str().unwrap().ends_with(" MB"));
    assert!(body["processingTime"].as_str().unwrap().ends_with('s'));

    let download_url = body["downloadUrl"].as_str().unwrap();
    let file_path = download_url
        .strip_prefix("http://remix.test")
        .expect("download url uses request host");
    assert!(file_path.starts_with("/outputs/vaporwave_"));

    let request = Request::builder().uri(file_path).body(Body::empty()).unwrap();
    let (status, served) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(served.starts_with(&[0xAAu8; 8192]));

    app.orchestrator.cleanup().shutdown().await;
    assert_eq!(file_count(&app.pipeline.staging_dir), 0);
    assert_eq!(file_count(&app.pipeline.output_dir), 1);
}

#[tokio::test]
async fn test_missing_output_is_404() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/outputs/lofi_expired.mp3")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let app = test_app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}
