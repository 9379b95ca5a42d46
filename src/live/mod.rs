//! Live voice consultation
//!
//! This module provides the real-time voice session core:
//! - `transport`: the tagged event stream and session handle abstraction
//! - `gemini`: the Gemini Live WebSocket transport
//! - `session`: the session state controller coordinating capture,
//!   encoding, playback scheduling, transcript, and teardown

pub mod gemini;
pub mod session;
pub mod transport;

pub use gemini::GeminiLiveTransport;
pub use session::{
    LiveSession, LiveSessionConfig, ScheduledAudio, SessionSnapshot, SessionStatus,
};
pub use transport::{LiveConfig, LiveConnection, LiveTransport, ServerEvent, SessionHandle};
