use super::transport::{LiveConfig, LiveTransport, ServerEvent, SessionHandle};
use crate::audio::{decode_chunk, encode_frame, CaptureBackend, PlaybackBuffer, PlaybackScheduler};
use crate::config::AudioConfig;
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Session status, the single source of truth for the presentation layer.
///
/// `Connected` covers listening; `Speaking` is derived from the playback
/// schedule, not from the raw inbound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Speaking,
    Error,
}

/// Audio scheduled for output, published to playback subscribers.
#[derive(Debug, Clone)]
pub struct ScheduledAudio {
    /// Start time on the output clock, seconds since session start
    pub start: f64,
    pub buffer: PlaybackBuffer,
}

/// Point-in-time view of a session for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub speaking: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Configuration for one live consultation session.
#[derive(Clone)]
pub struct LiveSessionConfig {
    pub session_id: String,
    pub live: LiveConfig,
    pub audio: AudioConfig,
}

type CaptureSlot = Arc<Mutex<Option<Box<dyn CaptureBackend>>>>;
type HandleSlot = Arc<Mutex<Option<SessionHandle>>>;

/// The live consultation controller.
///
/// Owns the capture backend, the session handle, and the playback schedule
/// for exactly one session's lifetime, and guarantees teardown of every
/// acquired resource on stop, error, or remote close.
pub struct LiveSession {
    config: LiveSessionConfig,

    transport: Arc<dyn LiveTransport>,

    /// Capture backend; exclusively owned for the session's lifetime
    capture: CaptureSlot,

    /// Outbound handle to the remote endpoint, present while connected
    handle: HandleSlot,

    status: Arc<RwLock<SessionStatus>>,
    last_error: Arc<RwLock<Option<String>>>,

    /// Append-only transcript, reset at each start
    transcript: Arc<Mutex<String>>,

    scheduler: Arc<Mutex<PlaybackScheduler>>,
    playback_tx: broadcast::Sender<ScheduledAudio>,

    /// Bumped on every teardown; callbacks from a previous epoch may not
    /// mutate state
    epoch: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
    /// Guards against overlapping start() calls while connecting
    starting: AtomicBool,

    started_at: RwLock<Option<DateTime<Utc>>>,

    outbound_task: Mutex<Option<JoinHandle<()>>>,
    inbound_task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveSession {
    pub fn new(
        config: LiveSessionConfig,
        transport: Arc<dyn LiveTransport>,
        capture: Box<dyn CaptureBackend>,
    ) -> Self {
        let (playback_tx, _) = broadcast::channel(64);

        Self {
            config,
            transport,
            capture: Arc::new(Mutex::new(Some(capture))),
            handle: Arc::new(Mutex::new(None)),
            status: Arc::new(RwLock::new(SessionStatus::Disconnected)),
            last_error: Arc::new(RwLock::new(None)),
            transcript: Arc::new(Mutex::new(String::new())),
            scheduler: Arc::new(Mutex::new(PlaybackScheduler::new())),
            playback_tx,
            epoch: Arc::new(AtomicU64::new(0)),
            active: Arc::new(AtomicBool::new(false)),
            starting: AtomicBool::new(false),
            started_at: RwLock::new(None),
            outbound_task: Mutex::new(None),
            inbound_task: Mutex::new(None),
        }
    }

    /// Subscribe to scheduled playback audio.
    pub fn subscribe_playback(&self) -> broadcast::Receiver<ScheduledAudio> {
        self.playback_tx.subscribe()
    }

    /// Start the session: acquire capture, open the transport, wire the
    /// outbound and inbound pipelines. A no-op if already active.
    pub async fn start(&self) -> Result<(), SessionError> {
        if self.active.load(Ordering::SeqCst) {
            warn!("session {} already active", self.config.session_id);
            return Ok(());
        }
        if self.starting.swap(true, Ordering::SeqCst) {
            warn!("session {} already connecting", self.config.session_id);
            return Ok(());
        }

        info!("starting live session {}", self.config.session_id);

        // Epoch at entry; any teardown between here and activation bumps it
        let epoch0 = self.epoch.load(Ordering::SeqCst);

        *self.transcript.lock().await = String::new();
        self.scheduler.lock().await.reset();
        *self.last_error.write().await = None;
        *self.status.write().await = SessionStatus::Connecting;

        // Acquire the capture stream first; no transport is opened if the
        // device is unavailable
        let frames = {
            let mut capture = self.capture.lock().await;
            let backend = match capture.as_mut() {
                Some(b) => b,
                None => {
                    let e = SessionError::DeviceUnavailable("capture already released".to_string());
                    self.fail(&e).await;
                    return Err(e);
                }
            };
            match backend.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    self.fail(&e).await;
                    return Err(e);
                }
            }
        };

        let opened = self.transport.open(&self.config.live).await;

        // stop() may have run while the transport was opening; its teardown
        // already happened, so this start must not come alive
        if self.epoch.load(Ordering::SeqCst) != epoch0 {
            info!("session {} stopped while connecting", self.config.session_id);
            if let Ok(connection) = opened {
                connection.handle.close();
            }
            if let Some(backend) = self.capture.lock().await.as_mut() {
                backend.stop().await;
            }
            self.starting.store(false, Ordering::SeqCst);
            return Ok(());
        }

        let connection = match opened {
            Ok(c) => c,
            Err(e) => {
                // Release the capture stream acquired above
                if let Some(backend) = self.capture.lock().await.as_mut() {
                    backend.stop().await;
                }
                self.fail(&e).await;
                return Err(e);
            }
        };

        self.active.store(true, Ordering::SeqCst);
        *self.started_at.write().await = Some(Utc::now());

        let handle = connection.handle.clone();
        *self.handle.lock().await = Some(connection.handle);

        // Outbound path: capture -> encoder -> handle, in capture order
        let capture_rate = self.config.audio.capture_rate;
        let active = Arc::clone(&self.active);
        let epoch = Arc::clone(&self.epoch);
        let outbound = tokio::spawn(async move {
            let mut frames = frames;
            while let Some(frame) = frames.recv().await {
                if !active.load(Ordering::SeqCst) || epoch.load(Ordering::SeqCst) != epoch0 {
                    break;
                }
                let chunk = encode_frame(&frame.samples, capture_rate);
                handle.send(chunk).await;
            }
        });
        *self.outbound_task.lock().await = Some(outbound);

        // Inbound path: event stream -> transitions, playback schedule,
        // transcript
        let inbound = self.spawn_inbound(connection.events, epoch0);
        *self.inbound_task.lock().await = Some(inbound);

        self.starting.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_inbound(
        &self,
        mut events: tokio::sync::mpsc::Receiver<ServerEvent>,
        epoch0: u64,
    ) -> JoinHandle<()> {
        let status = Arc::clone(&self.status);
        let last_error = Arc::clone(&self.last_error);
        let transcript = Arc::clone(&self.transcript);
        let scheduler = Arc::clone(&self.scheduler);
        let playback_tx = self.playback_tx.clone();
        let epoch = Arc::clone(&self.epoch);
        let active = Arc::clone(&self.active);
        let handle_slot = Arc::clone(&self.handle);
        let capture_slot = Arc::clone(&self.capture);
        let playback_rate = self.config.audio.playback_rate;
        let session_id = self.config.session_id.clone();

        tokio::spawn(async move {
            let clock = Instant::now();
            // Output-clock time at which speaking should clear, if pending
            let mut speaking_until: Option<f64> = None;

            loop {
                let guard_ok =
                    active.load(Ordering::SeqCst) && epoch.load(Ordering::SeqCst) == epoch0;
                if !guard_ok {
                    break;
                }

                let deadline = speaking_until.map(|t| {
                    let elapsed = clock.elapsed().as_secs_f64();
                    tokio::time::Instant::now()
                        + std::time::Duration::from_secs_f64((t - elapsed).max(0.0))
                });

                let event = if let Some(deadline) = deadline {
                    tokio::select! {
                        ev = events.recv() => Some(ev),
                        _ = tokio::time::sleep_until(deadline) => None,
                    }
                } else {
                    Some(events.recv().await)
                };

                let still_ok =
                    active.load(Ordering::SeqCst) && epoch.load(Ordering::SeqCst) == epoch0;

                match event {
                    // Speaking deadline passed with nothing further pending
                    None => {
                        speaking_until = None;
                        if still_ok {
                            let mut st = status.write().await;
                            if *st == SessionStatus::Speaking {
                                *st = SessionStatus::Connected;
                            }
                        }
                    }
                    Some(None) => {
                        // Event stream ended without a close notification
                        if still_ok {
                            teardown_resources(&handle_slot, &capture_slot, &epoch, &active).await;
                            let mut st = status.write().await;
                            if *st != SessionStatus::Error {
                                *st = SessionStatus::Disconnected;
                            }
                        }
                        break;
                    }
                    Some(Some(ev)) => {
                        if !still_ok {
                            break;
                        }
                        match ev {
                            ServerEvent::Opened => {
                                *status.write().await = SessionStatus::Connected;
                                info!("session {} connected", session_id);
                            }
                            ServerEvent::Audio(chunk) => match decode_chunk(&chunk) {
                                Ok(samples) => {
                                    let buffer = PlaybackBuffer::new(samples, playback_rate);
                                    let now = clock.elapsed().as_secs_f64();
                                    let mut sched = scheduler.lock().await;
                                    let start = sched.schedule(&buffer, now);
                                    speaking_until = Some(sched.next_start());
                                    drop(sched);
                                    let _ = playback_tx.send(ScheduledAudio { start, buffer });
                                    *status.write().await = SessionStatus::Speaking;
                                }
                                Err(e) => {
                                    // A malformed chunk is skipped, not fatal
                                    warn!("skipping inbound chunk: {}", e);
                                }
                            },
                            ServerEvent::InputTranscript(text)
                            | ServerEvent::OutputTranscript(text) => {
                                transcript.lock().await.push_str(&text);
                            }
                            ServerEvent::TurnComplete => {
                                transcript.lock().await.push('\n');
                            }
                            ServerEvent::Error(msg) => {
                                let err = SessionError::Transport(msg);
                                error!("session {}: {}", session_id, err);
                                *last_error.write().await = Some(err.to_string());
                                teardown_resources(&handle_slot, &capture_slot, &epoch, &active)
                                    .await;
                                *status.write().await = SessionStatus::Error;
                                break;
                            }
                            ServerEvent::Closed => {
                                info!("session {} closed by remote", session_id);
                                teardown_resources(&handle_slot, &capture_slot, &epoch, &active)
                                    .await;
                                let mut st = status.write().await;
                                if *st != SessionStatus::Error {
                                    *st = SessionStatus::Disconnected;
                                }
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    /// Stop the session and release every acquired resource. Idempotent;
    /// a no-op before `start()`.
    pub async fn stop(&self) {
        info!("stopping live session {}", self.config.session_id);

        teardown_resources(&self.handle, &self.capture, &self.epoch, &self.active).await;

        // Cancel pipeline tasks; the epoch bump already fences their writes
        if let Some(task) = self.outbound_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.inbound_task.lock().await.take() {
            task.abort();
        }

        self.scheduler.lock().await.reset();

        let mut st = self.status.write().await;
        if *st != SessionStatus::Error {
            *st = SessionStatus::Disconnected;
        }
    }

    async fn fail(&self, e: &SessionError) {
        error!("session {} failed to start: {}", self.config.session_id, e);
        *self.last_error.write().await = Some(e.to_string());
        *self.status.write().await = SessionStatus::Error;
        self.starting.store(false, Ordering::SeqCst);
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    pub async fn transcript(&self) -> String {
        self.transcript.lock().await.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let status = *self.status.read().await;
        SessionSnapshot {
            session_id: self.config.session_id.clone(),
            status,
            speaking: status == SessionStatus::Speaking,
            started_at: *self.started_at.read().await,
            error: self.last_error.read().await.clone(),
        }
    }
}

/// Release the session handle and the capture stream, each exactly once.
///
/// Safe to invoke repeatedly: the handle slot empties on first release, the
/// handle's own close is idempotent, and capture `stop()` tolerates a
/// stopped backend. The epoch bump fences any in-flight callback.
async fn teardown_resources(
    handle: &HandleSlot,
    capture: &CaptureSlot,
    epoch: &AtomicU64,
    active: &AtomicBool,
) {
    epoch.fetch_add(1, Ordering::SeqCst);
    active.store(false, Ordering::SeqCst);

    if let Some(h) = handle.lock().await.take() {
        h.close();
    }

    if let Some(backend) = capture.lock().await.as_mut() {
        backend.stop().await;
    }
}
