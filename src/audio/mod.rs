pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource, FixtureCapture, PcmFrame,
};
pub use codec::{decode_chunk, encode_frame, MediaChunk};
pub use playback::{PlaybackBuffer, PlaybackScheduler};
