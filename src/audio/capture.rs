use crate::error::SessionError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One capture frame of float PCM samples (mono).
#[derive(Debug, Clone)]
pub struct PcmFrame {
    /// Samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the live endpoint expects 16kHz)
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_size: 4096,
        }
    }
}

/// Audio capture backend trait
///
/// The live session owns exactly one backend for its lifetime. `stop()` is
/// idempotent and safe on a backend that never started.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync + std::fmt::Debug {
    /// Start capturing; returns a channel receiving frames in capture order
    async fn start(&mut self) -> Result<mpsc::Receiver<PcmFrame>, SessionError>;

    /// Stop capturing and release the device
    async fn stop(&mut self);

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Live microphone input
    Microphone,
    /// WAV file input (testing / scripted consultations)
    Fixture(PathBuf),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureBackend>, SessionError> {
        match source {
            CaptureSource::Microphone => Err(SessionError::DeviceUnavailable(
                "microphone capture is not available in this build".to_string(),
            )),
            CaptureSource::Fixture(path) => {
                let backend = FixtureCapture::new(path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}

/// Streams fixed-size frames out of a WAV file.
///
/// Frames are paced at their real-time duration so the outbound path sees
/// the same cadence a microphone would produce.
#[derive(Debug)]
pub struct FixtureCapture {
    path: PathBuf,
    config: CaptureConfig,
    paced: bool,
    capturing: Arc<AtomicBool>,
}

impl FixtureCapture {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Result<Self, SessionError> {
        if !path.exists() {
            return Err(SessionError::DeviceUnavailable(format!(
                "fixture not found: {}",
                path.display()
            )));
        }

        Ok(Self {
            path,
            config,
            paced: true,
            capturing: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Disable real-time pacing (tests).
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    fn read_samples(&self) -> Result<Vec<f32>, SessionError> {
        let mut reader = hound::WavReader::open(&self.path)
            .map_err(|e| SessionError::DeviceUnavailable(format!("cannot open fixture: {}", e)))?;

        let spec = reader.spec();
        if spec.sample_rate != self.config.sample_rate {
            warn!(
                "fixture rate {} differs from capture rate {}; samples passed through as-is",
                spec.sample_rate, self.config.sample_rate
            );
        }

        let samples: Result<Vec<i16>, _> = reader.samples::<i16>().collect();
        let samples =
            samples.map_err(|e| SessionError::DeviceUnavailable(format!("bad fixture: {}", e)))?;

        // Mix interleaved channels down to mono
        let channels = spec.channels as usize;
        let mono: Vec<f32> = if channels > 1 {
            samples
                .chunks(channels)
                .map(|c| c.iter().map(|&s| s as f32 / 32768.0).sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples.iter().map(|&s| s as f32 / 32768.0).collect()
        };

        Ok(mono)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FixtureCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<PcmFrame>, SessionError> {
        let samples = self.read_samples()?;
        let (tx, rx) = mpsc::channel(32);

        self.capturing.store(true, Ordering::SeqCst);

        let capturing = Arc::clone(&self.capturing);
        let frame_size = self.config.frame_size;
        let sample_rate = self.config.sample_rate;
        let paced = self.paced;
        let frame_ms = (frame_size as u64 * 1000) / sample_rate as u64;

        tokio::spawn(async move {
            info!("fixture capture started ({} samples)", samples.len());

            let mut timestamp_ms = 0u64;
            for window in samples.chunks(frame_size) {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                // Pad the tail so every frame is fixed-size
                let mut frame = window.to_vec();
                frame.resize(frame_size, 0.0);

                let pcm = PcmFrame {
                    samples: frame,
                    sample_rate,
                    timestamp_ms,
                };

                if tx.send(pcm).await.is_err() {
                    break;
                }

                timestamp_ms += frame_ms;
                if paced {
                    tokio::time::sleep(std::time::Duration::from_millis(frame_ms)).await;
                }
            }

            capturing.store(false, Ordering::SeqCst);
            info!("fixture capture finished");
        });

        Ok(rx)
    }

    async fn stop(&mut self) {
        // Safe to call repeatedly or before start
        self.capturing.store(false, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
