pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod live;

pub use analysis::{AnalysisResult, DocumentFile, GeminiClient};
pub use audio::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource, FixtureCapture,
    MediaChunk, PcmFrame, PlaybackBuffer, PlaybackScheduler,
};
pub use config::Config;
pub use error::{AnalysisError, SessionError};
pub use http::{create_router, AppState};
pub use live::{
    GeminiLiveTransport, LiveConfig, LiveConnection, LiveSession, LiveSessionConfig, LiveTransport,
    ServerEvent, SessionHandle, SessionStatus,
};
