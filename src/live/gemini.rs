//! Gemini Live transport
//!
//! WebSocket client for the `BidiGenerateContent` endpoint. The wire
//! protocol stays inside this module: the rest of the crate only sees the
//! `LiveTransport` trait and the tagged `ServerEvent` stream.

use super::transport::{LiveConfig, LiveConnection, LiveTransport, ServerEvent, SessionHandle};
use crate::audio::MediaChunk;
use crate::error::SessionError;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

pub struct GeminiLiveTransport {
    api_key: String,
}

impl GeminiLiveTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn setup_message(config: &LiveConfig) -> Value {
        json!({
            "setup": {
                "model": format!("models/{}", config.model),
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {
                            "prebuiltVoiceConfig": { "voiceName": config.voice }
                        }
                    }
                },
                "systemInstruction": {
                    "parts": [{ "text": config.system_instruction }]
                },
                "inputAudioTranscription": {},
                "outputAudioTranscription": {}
            }
        })
    }

    fn realtime_input(chunk: &MediaChunk) -> Value {
        json!({
            "realtimeInput": {
                "mediaChunks": [{
                    "mimeType": chunk.mime_type,
                    "data": chunk.data
                }]
            }
        })
    }

    /// Map one server message onto events. A single frame can carry audio,
    /// a transcription fragment, and a turn marker together; each becomes
    /// its own event so downstream sees one payload per event.
    fn parse_server_message(payload: &[u8], events: &mut Vec<ServerEvent>) {
        let value: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!("unparseable server message: {}", e);
                return;
            }
        };

        let Some(content) = value.get("serverContent") else {
            return;
        };

        if let Some(data) = content
            .pointer("/modelTurn/parts/0/inlineData/data")
            .and_then(Value::as_str)
        {
            let mime_type = content
                .pointer("/modelTurn/parts/0/inlineData/mimeType")
                .and_then(Value::as_str)
                .unwrap_or("audio/pcm;rate=24000")
                .to_string();
            events.push(ServerEvent::Audio(MediaChunk {
                data: data.to_string(),
                mime_type,
            }));
        }

        if let Some(text) = content
            .pointer("/inputTranscription/text")
            .and_then(Value::as_str)
        {
            events.push(ServerEvent::InputTranscript(text.to_string()));
        }

        if let Some(text) = content
            .pointer("/outputTranscription/text")
            .and_then(Value::as_str)
        {
            events.push(ServerEvent::OutputTranscript(text.to_string()));
        }

        if content
            .get("turnComplete")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            events.push(ServerEvent::TurnComplete);
        }
    }
}

#[async_trait::async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn open(&self, config: &LiveConfig) -> Result<LiveConnection, SessionError> {
        let url = format!("{}?key={}", LIVE_ENDPOINT, self.api_key);

        info!("opening live session (model={})", config.model);

        let connect = async {
            let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| SessionError::TransportOpenFailed(e.to_string()))?;

            let setup = Self::setup_message(config);
            ws.send(Message::Text(setup.to_string()))
                .await
                .map_err(|e| SessionError::TransportOpenFailed(e.to_string()))?;

            // The endpoint acknowledges the setup before streaming anything
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let v: Value = serde_json::from_str(&text).map_err(|e| {
                            SessionError::TransportOpenFailed(format!("bad setup ack: {}", e))
                        })?;
                        if v.get("setupComplete").is_some() {
                            return Ok(ws);
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let v: Value = serde_json::from_slice(&bytes).map_err(|e| {
                            SessionError::TransportOpenFailed(format!("bad setup ack: {}", e))
                        })?;
                        if v.get("setupComplete").is_some() {
                            return Ok(ws);
                        }
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        return Err(SessionError::TransportOpenFailed(e.to_string()));
                    }
                    None => {
                        return Err(SessionError::TransportOpenFailed(
                            "connection closed during setup".to_string(),
                        ));
                    }
                }
            }
        };

        let ws = tokio::time::timeout(config.open_timeout, connect)
            .await
            .map_err(|_| {
                SessionError::TransportOpenFailed(format!(
                    "no setup ack within {}s",
                    config.open_timeout.as_secs()
                ))
            })??;

        info!("live session accepted");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<MediaChunk>(64);
        let (close_tx, mut close_rx) = mpsc::channel::<()>(1);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(256);

        let handle = SessionHandle::new(outbound_tx, close_tx);

        let _ = event_tx.try_send(ServerEvent::Opened);

        tokio::spawn(async move {
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    chunk = outbound_rx.recv() => {
                        match chunk {
                            Some(chunk) => {
                                let msg = GeminiLiveTransport::realtime_input(&chunk);
                                if let Err(e) = sink.send(Message::Text(msg.to_string())).await {
                                    warn!("outbound send failed: {}", e);
                                    let _ = event_tx.send(ServerEvent::Error(e.to_string())).await;
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = close_rx.recv() => {
                        let _ = sink.send(Message::Close(None)).await;
                        let _ = event_tx.send(ServerEvent::Closed).await;
                        break;
                    }
                    msg = stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let mut events = Vec::new();
                                GeminiLiveTransport::parse_server_message(text.as_bytes(), &mut events);
                                for ev in events {
                                    if event_tx.send(ev).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Some(Ok(Message::Binary(bytes))) => {
                                let mut events = Vec::new();
                                GeminiLiveTransport::parse_server_message(&bytes, &mut events);
                                for ev in events {
                                    if event_tx.send(ev).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = event_tx.send(ServerEvent::Closed).await;
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                let _ = event_tx.send(ServerEvent::Error(e.to_string())).await;
                                break;
                            }
                        }
                    }
                }
            }

            info!("live connection task finished");
        });

        Ok(LiveConnection {
            handle,
            events: event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> LiveConfig {
        LiveConfig {
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            voice: "Zephyr".to_string(),
            system_instruction: "Be concise.".to_string(),
            open_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn setup_message_enables_both_transcriptions() {
        let setup = GeminiLiveTransport::setup_message(&config());
        let setup = &setup["setup"];
        assert!(setup.get("inputAudioTranscription").is_some());
        assert!(setup.get("outputAudioTranscription").is_some());
        assert_eq!(
            setup["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Zephyr"
        );
    }

    #[test]
    fn server_message_with_audio_transcript_and_turn_yields_three_events() {
        let payload = serde_json::json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [{ "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AAAA" } }]
                },
                "outputTranscription": { "text": "hello" },
                "turnComplete": true
            }
        });

        let mut events = Vec::new();
        GeminiLiveTransport::parse_server_message(payload.to_string().as_bytes(), &mut events);

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ServerEvent::Audio(_)));
        assert!(matches!(events[1], ServerEvent::OutputTranscript(ref t) if t == "hello"));
        assert!(matches!(events[2], ServerEvent::TurnComplete));
    }

    #[test]
    fn unrelated_server_message_yields_nothing() {
        let mut events = Vec::new();
        GeminiLiveTransport::parse_server_message(b"{\"usageMetadata\":{}}", &mut events);
        assert!(events.is_empty());
    }
}
