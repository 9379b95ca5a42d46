use crate::audio::MediaChunk;
use crate::error::SessionError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Configuration for one live session.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Model identifier at the remote endpoint
    pub model: String,
    /// Prebuilt voice name for audio responses
    pub voice: String,
    /// System instruction text
    pub system_instruction: String,
    /// Bound on session establishment
    pub open_timeout: Duration,
}

/// One inbound event from the remote endpoint.
///
/// Each event carries at most one payload; events arrive in the order the
/// endpoint emits them and map one-to-one onto controller transitions.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// The endpoint accepted the session
    Opened,
    /// Model audio (PCM16 @ 24kHz, base64)
    Audio(MediaChunk),
    /// Transcription fragment of the user's speech
    InputTranscript(String),
    /// Transcription fragment of the model's speech
    OutputTranscript(String),
    /// The model finished a conversational turn
    TurnComplete,
    /// Mid-session transport error
    Error(String),
    /// Clean close notification; no events follow
    Closed,
}

/// An open connection: the outbound handle plus the inbound event stream.
pub struct LiveConnection {
    pub handle: SessionHandle,
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Opens live sessions against a remote voice endpoint.
///
/// `open` resolves once the endpoint has accepted the session, so every send
/// on the returned handle happens after acceptance.
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    async fn open(&self, config: &LiveConfig) -> Result<LiveConnection, SessionError>;
}

/// Outbound side of a live connection.
///
/// At most one live handle exists per session controller. Submission order
/// is preserved by the underlying channel.
#[derive(Clone)]
pub struct SessionHandle {
    outbound: mpsc::Sender<MediaChunk>,
    close_tx: mpsc::Sender<()>,
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new(outbound: mpsc::Sender<MediaChunk>, close_tx: mpsc::Sender<()>) -> Self {
        Self {
            outbound,
            close_tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueue an encoded chunk, waiting while the connection is backed up.
    ///
    /// Chunks are queued in submission order, never dropped on a stall. A
    /// send after the connection closed is logged, never fatal.
    pub async fn send(&self, chunk: MediaChunk) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("dropping outbound chunk: session already closed");
            return;
        }
        if self.outbound.send(chunk).await.is_err() {
            warn!("dropping outbound chunk: connection task gone");
        }
    }

    /// Request the endpoint to terminate. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.close_tx.try_send(());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
