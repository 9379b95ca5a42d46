// Tests for the HTTP presentation boundary.
//
// Everything here runs offline: validation failures and missing-session
// paths are rejected before any remote call is attempted.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use juriscore::audio::MediaChunk;
use juriscore::config::{AudioConfig, GeminiConfig};
use juriscore::error::SessionError;
use juriscore::live::{LiveConfig, LiveConnection, LiveTransport, ServerEvent, SessionHandle};
use juriscore::{create_router, AppState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

fn test_gemini() -> GeminiConfig {
    GeminiConfig {
        api_key: "test-key".to_string(),
        analysis_model: "gemini-2.5-flash".to_string(),
        live_model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
        tts_model: "gemini-2.5-flash-preview-tts".to_string(),
        voice: "Zephyr".to_string(),
        live_system_instruction: "Be concise.".to_string(),
        open_timeout_secs: 1,
    }
}

fn test_state() -> AppState {
    AppState::new(test_gemini(), AudioConfig::default())
}

/// Transport that accepts every session and counts opens.
struct CountingTransport {
    open_calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl LiveTransport for CountingTransport {
    async fn open(&self, _config: &LiveConfig) -> Result<LiveConnection, SessionError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);

        let (out_tx, mut out_rx) = mpsc::channel::<MediaChunk>(64);
        let (close_tx, mut close_rx) = mpsc::channel::<()>(1);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(8);

        let handle = SessionHandle::new(out_tx, close_tx);
        let _ = event_tx.try_send(ServerEvent::Opened);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    chunk = out_rx.recv() => if chunk.is_none() { break },
                    _ = close_rx.recv() => break,
                }
            }
            drop(event_tx);
        });

        Ok(LiveConnection {
            handle,
            events: event_rx,
        })
    }
}

fn write_fixture(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("consult.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..4096 {
        writer.write_sample(1024i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_check_responds_ok() {
    let app = create_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn analyzing_a_png_is_rejected_without_a_remote_call() {
    let app = create_router(test_state());
    let body = serde_json::json!({
        "name": "scan.png",
        "mime_type": "image/png",
        "data": "aGVsbG8="
    });

    let response = app.oneshot(json_request("/documents/analyze", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let err: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(err["error"].as_str().unwrap().contains("unsupported format"));
}

#[tokio::test]
async fn consultation_status_without_a_session_is_not_found() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/consultation/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stopping_without_a_session_is_not_found() {
    let app = create_router(test_state());
    let response = app
        .oneshot(json_request("/consultation/stop", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn starting_without_a_capture_device_is_unavailable() {
    let app = create_router(test_state());
    // No fixture given and no microphone in this build
    let response = app
        .oneshot(json_request("/consultation/start", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn concurrent_starts_yield_exactly_one_session() {
    let open_calls = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(CountingTransport {
        open_calls: Arc::clone(&open_calls),
    });
    let state = AppState::with_transport(test_gemini(), AudioConfig::default(), transport);
    let app = create_router(state);

    let dir = tempfile::TempDir::new().unwrap();
    let fixture = write_fixture(&dir);
    let body = serde_json::json!({ "fixture": fixture.to_string_lossy() });

    let (first, second) = tokio::join!(
        app.clone().oneshot(json_request("/consultation/start", body.clone())),
        app.clone().oneshot(json_request("/consultation/start", body)),
    );

    let mut statuses = [first.unwrap().status(), second.unwrap().status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(open_calls.load(Ordering::SeqCst), 1, "one transport opened");

    // The winner is stoppable and carries its slot
    let response = app
        .oneshot(json_request("/consultation/stop", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn starting_with_a_missing_fixture_is_unavailable() {
    let app = create_router(test_state());
    let response = app
        .oneshot(json_request(
            "/consultation/start",
            serde_json::json!({ "fixture": "/nonexistent/consult.wav" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
