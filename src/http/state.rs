use crate::analysis::GeminiClient;
use crate::config::{AudioConfig, GeminiConfig};
use crate::live::{GeminiLiveTransport, LiveSession, LiveTransport};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Gemini request/response client (analysis, speech, citations)
    pub client: Arc<GeminiClient>,

    /// Gemini settings used to open live sessions
    pub gemini: GeminiConfig,

    /// Audio rates and frame size for live sessions
    pub audio: AudioConfig,

    /// Transport used to open live sessions
    pub live_transport: Arc<dyn LiveTransport>,

    /// The single live consultation slot; one session per controller
    pub consultation: Arc<RwLock<Option<Arc<LiveSession>>>>,
}

impl AppState {
    pub fn new(gemini: GeminiConfig, audio: AudioConfig) -> Self {
        let transport = Arc::new(GeminiLiveTransport::new(gemini.api_key.clone()));
        Self::with_transport(gemini, audio, transport)
    }

    /// State with a caller-supplied live transport.
    pub fn with_transport(
        gemini: GeminiConfig,
        audio: AudioConfig,
        live_transport: Arc<dyn LiveTransport>,
    ) -> Self {
        Self {
            client: Arc::new(GeminiClient::new(gemini.clone())),
            gemini,
            audio,
            live_transport,
            consultation: Arc::new(RwLock::new(None)),
        }
    }
}
