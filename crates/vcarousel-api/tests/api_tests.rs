//! Router tests against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use vcarousel_api::{create_router, ApiConfig, AppState, SessionConfig, StorageBackend};
use vcarousel_storage::{MemoryStore, VideoStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "vcarousel-test-boundary";

fn test_config() -> ApiConfig {
    ApiConfig {
        storage_backend: StorageBackend::Memory,
        ..Default::default()
    }
}

fn app_with(config: ApiConfig, store: Arc<MemoryStore>) -> Router {
    let storage: Arc<dyn VideoStore> = store;
    create_router(AppState::with_store(config, storage))
}

fn app(store: Arc<MemoryStore>) -> Router {
    app_with(test_config(), store)
}

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn multipart(parts: &[Part<'_>]) -> Body {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(multipart(parts))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_storage_outage() {
    let store = Arc::new(MemoryStore::new());
    let app = app(Arc::clone(&store));

    let response = app.clone().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    store.set_available(false);
    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["storage"]["status"], "error");
    assert_eq!(body["turnstile"]["status"], "disabled");
}

#[tokio::test]
async fn test_list_videos_pairs_thumbnails() {
    let store = Arc::new(MemoryStore::new());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    store.insert_at("videos/a.mp4", vec![0; 5], "video/mp4", t0).await;
    store
        .insert_at("videos/b.webm", vec![0; 7], "video/webm", t0 + chrono::Duration::minutes(5))
        .await;
    store.insert_at("thumbnails/a.jpg", vec![1], "image/jpeg", t0).await;

    let response = app(store).oneshot(get("/list-videos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let videos = body["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0]["key"], "videos/b.webm");
    assert_eq!(videos[0]["size"], 7);
    assert!(videos[0].get("thumbnail").map_or(true, Value::is_null));
    assert_eq!(videos[1]["key"], "videos/a.mp4");
    assert_eq!(videos[1]["url"], "/videos/videos/a.mp4");
    assert_eq!(videos[1]["thumbnail"], "/videos/thumbnails/a.jpg");
    assert!(videos[1]["lastModified"].is_string());
}

#[tokio::test]
async fn test_api_prefix_serves_same_routes() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(get("/api/list-videos"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "videos": [] }));
}

#[tokio::test]
async fn test_upload_rejects_non_video_and_accepts_video() {
    let store = Arc::new(MemoryStore::new());
    let app = app(Arc::clone(&store));

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload",
            &[Part {
                name: "file",
                file_name: Some("notes.txt"),
                content_type: Some("text/plain"),
                data: b"hello",
            }],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(store.is_empty().await);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload",
            &[Part {
                name: "file",
                file_name: Some("My Trip.mp4"),
                content_type: Some("video/mp4"),
                data: &[0u8; 32],
            }],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["key"], "videos/My_Trip.mp4");
    assert_eq!(body["size"], 32);
    assert!(store.exists("videos/My_Trip.mp4").await.unwrap());
}

#[tokio::test]
async fn test_upload_conflicts_on_shared_stem() {
    let store = Arc::new(MemoryStore::new());
    store.put_object("videos/trip.mp4", vec![0; 4], "video/mp4").await.unwrap();

    let response = app(Arc::clone(&store))
        .oneshot(multipart_request(
            "/upload",
            &[Part {
                name: "file",
                file_name: Some("trip.webm"),
                content_type: Some("video/webm"),
                data: &[0u8; 8],
            }],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(!store.exists("videos/trip.webm").await.unwrap());
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(multipart_request(
            "/upload",
            &[Part {
                name: "other",
                file_name: None,
                content_type: None,
                data: b"x",
            }],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .contains("file"));
}

#[tokio::test]
async fn test_range_request_returns_partial_content() {
    let store = Arc::new(MemoryStore::new());
    store
        .put_object("videos/clip.mp4", (0u8..=99).collect(), "video/mp4")
        .await
        .unwrap();
    let app = app(store);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/videos/videos/clip.mp4")
                .header(header::RANGE, "bytes=10-19")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 10-19/100");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
    assert_eq!(body_bytes(response).await, (10u8..20).collect::<Vec<_>>());

    let response = app
        .clone()
        .oneshot(get("/videos/videos/clip.mp4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.len(), 100);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/videos/videos/clip.mp4")
                .header(header::RANGE, "bytes=500-")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_get_rejects_unsafe_and_missing_keys() {
    let app = app(Arc::new(MemoryStore::new()));

    let response = app
        .clone()
        .oneshot(get("/videos/videos/..%2Fsecret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/videos/videos/missing.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_video_and_missing_video() {
    let store = Arc::new(MemoryStore::new());
    store.put_object("videos/a.mp4", vec![1, 2, 3], "video/mp4").await.unwrap();
    store.put_object("thumbnails/a.png", vec![9], "image/png").await.unwrap();
    let app = app(Arc::clone(&store));

    let delete = |uri: &str| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete("/videos/videos/a.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.is_empty().await);

    let response = app.oneshot(delete("/videos/videos/a.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thumbnail_upload_appears_in_listing() {
    let store = Arc::new(MemoryStore::new());
    store.put_object("videos/trip.mp4", vec![0; 4], "video/mp4").await.unwrap();
    let app = app(Arc::clone(&store));

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload-thumbnail",
            &[
                Part {
                    name: "videoKey",
                    file_name: None,
                    content_type: None,
                    data: b"videos/trip.mp4",
                },
                Part {
                    name: "file",
                    file_name: Some("cover.png"),
                    content_type: Some("image/png"),
                    data: &[7u8; 3],
                },
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["key"], "thumbnails/trip.png");

    let response = app.clone().oneshot(get("/list-videos")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["videos"][0]["thumbnail"], "/videos/thumbnails/trip.png");

    let response = app
        .oneshot(multipart_request(
            "/upload-thumbnail",
            &[
                Part {
                    name: "videoKey",
                    file_name: None,
                    content_type: None,
                    data: b"videos/none.mp4",
                },
                Part {
                    name: "file",
                    file_name: Some("cover.png"),
                    content_type: Some("image/png"),
                    data: &[7u8; 3],
                },
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snippet_renders_escaped_html() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(post_json(
            "/snippet",
            json!({
                "items": [
                    { "url": "https://cdn.example.com/a.mp4", "name": "</script><script>alert(1)</script>" },
                    { "url": "https://youtu.be/dQw4w9WgXcQ" }
                ],
                "options": { "containerId": "promo", "loop": true }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("id=\"promo\""));
    assert!(!html.contains("<script>alert(1)"));
    assert!(html.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    assert!(html.contains("vc-dots"));
}

#[tokio::test]
async fn test_snippet_falls_back_to_bucket_listing() {
    let store = Arc::new(MemoryStore::new());
    let app = app(Arc::clone(&store));

    let response = app
        .clone()
        .oneshot(post_json("/snippet", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    store.put_object("videos/intro.mp4", vec![0; 2], "video/mp4").await.unwrap();
    let response = app.oneshot(post_json("/snippet", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("/videos/videos/intro.mp4"));
}

#[tokio::test]
async fn test_snippet_rejects_unsafe_and_malformed_items() {
    let app = app(Arc::new(MemoryStore::new()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/snippet",
            json!({ "items": [{ "url": "javascript:alert(document.domain)//vimeo.com" }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let response = app
        .oneshot(post_json(
            "/snippet",
            json!({ "items": [{ "url": "https://youtube.com/watch?v=short" }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .contains("invalid format"));
}

async fn turnstile(success: bool) -> MockServer {
    let server = MockServer::start().await;
    let body = if success {
        json!({ "success": true, "hostname": "example.com" })
    } else {
        json!({ "success": false, "error-codes": ["invalid-input-response"] })
    };
    Mock::given(method("POST"))
        .and(path("/siteverify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn session_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        session: SessionConfig {
            turnstile_secret: Some("secret".to_string()),
            verify_url: format!("{}/siteverify", server.uri()),
            ttl: Duration::from_secs(120),
            ..Default::default()
        },
        ..test_config()
    }
}

#[tokio::test]
async fn test_session_verify_then_lookup() {
    let server = turnstile(true).await;
    let app = app_with(session_config(&server), Arc::new(MemoryStore::new()));

    let response = app
        .clone()
        .oneshot(post_json("/session/verify", json!({ "token": "widget-token" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["ttlSeconds"], 120);
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/session/{}", session_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["sessionId"], session_id.as_str());

    let response = app.oneshot(get("/session/not-a-session")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_verify_rejected_token() {
    let server = turnstile(false).await;
    let app = app_with(session_config(&server), Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(post_json("/session/verify", json!({ "token": "bad" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .contains("invalid-input-response"));
}

#[tokio::test]
async fn test_session_verify_without_secret_is_unavailable() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(post_json("/session/verify", json!({ "token": "t" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_session_webhook_is_notified() {
    let server = turnstile(true).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = session_config(&server);
    config.session.webhook_url = Some(format!("{}/hook", server.uri()));
    let app = app_with(config, Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(post_json(
            "/session/verify",
            json!({ "token": "t", "metadata": { "page": "/landing" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut hook_body = None;
    for _ in 0..50 {
        let requests = server.received_requests().await.unwrap_or_default();
        if let Some(request) = requests.iter().find(|r| r.url.path() == "/hook") {
            hook_body = Some(serde_json::from_slice::<Value>(&request.body).unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let hook_body = hook_body.expect("webhook was not called");
    assert_eq!(hook_body["event"], "session.created");
    assert_eq!(hook_body["metadata"]["page"], "/landing");
    assert!(hook_body["sessionId"].is_string());
}

#[tokio::test]
async fn test_rate_limit_per_client_ip() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        rate_limit_burst: 1,
        ..test_config()
    };
    let app = app_with(config, Arc::new(MemoryStore::new()));

    let request = || {
        Request::builder()
            .uri("/list-videos")
            .header("X-Forwarded-For", "192.0.2.10")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    assert!(body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .starts_with("Rate limit exceeded"));

    // Probes are never limited
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_present() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(get("/health"))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cross-origin-resource-policy"], "same-origin");
    assert!(headers.contains_key("x-request-id"));
}
