use super::state::AppState;
use crate::analysis::DocumentFile;
use crate::audio::{CaptureBackendFactory, CaptureConfig, CaptureSource};
use crate::error::{AnalysisError, SessionError};
use crate::live::{LiveConfig, LiveSession, LiveSessionConfig, SessionStatus};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartConsultationRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Optional WAV fixture to stream instead of a microphone
    pub fixture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartConsultationResponse {
    pub session_id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct StopConsultationResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    /// Base64 PCM audio
    pub audio: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCitationsRequest {
    pub citations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyCitationsResponse {
    pub report: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn analysis_error_response(e: AnalysisError) -> axum::response::Response {
    let status = match &e {
        AnalysisError::UnsupportedFormat(_) | AnalysisError::TooLarge { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::Failed => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /documents/analyze
/// Analyze an uploaded legal document
pub async fn analyze_document(
    State(state): State<AppState>,
    Json(document): Json<DocumentFile>,
) -> impl IntoResponse {
    match state.client.analyze_document(&document).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!("document analysis failed: {}", e);
            analysis_error_response(e)
        }
    }
}

/// POST /consultation/start
/// Start the live voice consultation
pub async fn start_consultation(
    State(state): State<AppState>,
    Json(req): Json<StartConsultationRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("consultation-{}", uuid::Uuid::new_v4()));

    info!("starting consultation: {}", session_id);

    // One live session at a time; the slot stays locked through
    // check, start, and insert so concurrent starts serialize
    let mut slot = state.consultation.write().await;
    if let Some(existing) = slot.as_ref() {
        let status = existing.status().await;
        if status != SessionStatus::Disconnected && status != SessionStatus::Error {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "a consultation is already active".to_string(),
                }),
            )
                .into_response();
        }
    }

    let capture_config = CaptureConfig {
        sample_rate: state.audio.capture_rate,
        frame_size: state.audio.frame_size,
    };
    let source = match req.fixture {
        Some(path) => CaptureSource::Fixture(path.into()),
        None => CaptureSource::Microphone,
    };

    let capture = match CaptureBackendFactory::create(source, capture_config) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to create capture backend: {}", e);
            return session_error_response(e);
        }
    };

    let config = LiveSessionConfig {
        session_id: session_id.clone(),
        live: LiveConfig {
            model: state.gemini.live_model.clone(),
            voice: state.gemini.voice.clone(),
            system_instruction: state.gemini.live_system_instruction.clone(),
            open_timeout: Duration::from_secs(state.gemini.open_timeout_secs),
        },
        audio: state.audio.clone(),
    };

    let transport = Arc::clone(&state.live_transport);
    let session = Arc::new(LiveSession::new(config, transport, capture));

    if let Err(e) = session.start().await {
        error!("failed to start consultation: {}", e);
        return session_error_response(e);
    }

    *slot = Some(Arc::clone(&session));

    (
        StatusCode::OK,
        Json(StartConsultationResponse {
            session_id,
            status: session.status().await,
        }),
    )
        .into_response()
}

fn session_error_response(e: SessionError) -> axum::response::Response {
    let status = match &e {
        SessionError::PermissionDenied | SessionError::DeviceUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// POST /consultation/stop
/// Stop the live voice consultation
pub async fn stop_consultation(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut slot = state.consultation.write().await;
        slot.take()
    };

    match session {
        Some(session) => {
            session.stop().await;
            let snapshot = session.snapshot().await;
            (
                StatusCode::OK,
                Json(StopConsultationResponse {
                    session_id: snapshot.session_id,
                    status: snapshot.status,
                    transcript: session.transcript().await,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active consultation".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /consultation/status
/// Status and speaking flag for the presentation layer
pub async fn consultation_status(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.consultation.read().await;
    match slot.as_ref() {
        Some(session) => (StatusCode::OK, Json(session.snapshot().await)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active consultation".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /consultation/transcript
/// Accumulated transcript so far
pub async fn consultation_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.consultation.read().await;
    match slot.as_ref() {
        Some(session) => (StatusCode::OK, session.transcript().await).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active consultation".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /speech
/// Synthesize readback audio for analysis text
pub async fn generate_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> impl IntoResponse {
    match state.client.generate_speech(&req.text).await {
        Ok(audio) => (
            StatusCode::OK,
            Json(SpeechResponse {
                audio: base64::engine::general_purpose::STANDARD.encode(audio),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("speech synthesis failed: {}", e);
            analysis_error_response(e)
        }
    }
}

/// POST /citations/verify
/// Verify cited authorities
pub async fn verify_citations(
    State(state): State<AppState>,
    Json(req): Json<VerifyCitationsRequest>,
) -> impl IntoResponse {
    match state.client.verify_citations(&req.citations).await {
        Ok(report) => (StatusCode::OK, Json(VerifyCitationsResponse { report })).into_response(),
        Err(e) => {
            error!("citation verification failed: {}", e);
            analysis_error_response(e)
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
