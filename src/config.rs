use anyhow::Result;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture rate expected by the live endpoint (outbound)
    pub capture_rate: u32,
    /// Playback rate emitted by the live endpoint (inbound)
    pub playback_rate: u32,
    /// Samples per capture frame
    pub frame_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_rate: 16000,
            playback_rate: 24000,
            frame_size: 4096,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key; the GEMINI_API_KEY environment variable takes precedence
    #[serde(default)]
    pub api_key: String,
    pub analysis_model: String,
    pub live_model: String,
    pub tts_model: String,
    pub voice: String,
    pub live_system_instruction: String,
    /// Bound on how long session establishment may take
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
}

fn default_open_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("analysis_model", &self.analysis_model)
            .field("live_model", &self.live_model)
            .field("tts_model", &self.tts_model)
            .field("voice", &self.voice)
            .field("open_timeout_secs", &self.open_timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            cfg.gemini.api_key = key;
        }

        if cfg.gemini.api_key.is_empty() {
            anyhow::bail!(
                "GEMINI_API_KEY is not set. Configure it in your environment or config file."
            );
        }

        Ok(cfg)
    }
}
