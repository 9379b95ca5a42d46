use thiserror::Error;

/// Errors raised by the live consultation core.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("microphone access denied")]
    PermissionDenied,

    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),

    #[error("failed to open live session: {0}")]
    TransportOpenFailed(String),

    #[error("live session error: {0}")]
    Transport(String),

    #[error("failed to decode inbound audio chunk: {0}")]
    Decode(String),
}

/// Errors raised by document upload and analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("unsupported format: {0} (only application/pdf is accepted)")]
    UnsupportedFormat(String),

    #[error("document exceeds maximum size: {size} bytes (limit: {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    #[error("document analysis failed")]
    Failed,
}
