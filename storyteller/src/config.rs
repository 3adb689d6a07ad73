//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use llm::GeminiClient;
use tts::{GoogleTts, VoiceConfig};

use crate::pipeline::{ModelNames, PipelineOptions, Storyteller};
use crate::request::RequestDefaults;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Serve narrated, illustrated stories over a websocket")]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    /// Directory served on every path other than `/ws`
    #[arg(long, env = "STATIC_DIR", default_value = "../frontend/build/web")]
    pub static_dir: PathBuf,

    /// Without a key the server starts but tells no stories
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,
    #[arg(long, env = "GEMINI_BASE_URL", default_value = llm::gemini::DEFAULT_BASE_URL)]
    pub gemini_base_url: String,
    #[arg(long, env = "GEMINI_MODEL_STORY", default_value = "gemini-3-pro-preview")]
    pub story_model: String,
    #[arg(long, env = "GEMINI_MODEL_IMAGE", default_value = "gemini-3-pro-image-preview")]
    pub image_model: String,
    /// Model for both summaries and suggestions
    #[arg(
        long,
        env = "GEMINI_MODEL_SUMMARY",
        default_value = "gemini-2.5-flash-preview-09-2025"
    )]
    pub summary_model: String,

    #[arg(long, env = "TTS_BASE_URL", default_value = tts::google::DEFAULT_BASE_URL)]
    pub tts_base_url: String,
    /// Falls back to the Gemini key
    #[arg(long, env = "TTS_API_KEY", hide_env_values = true)]
    pub tts_api_key: Option<String>,
    #[arg(long, env = "DEFAULT_VOICE", default_value = "Puck")]
    pub default_voice: String,
    #[arg(long, env = "DEFAULT_TTS_MODEL", default_value = "gemini-2.5-flash-tts")]
    pub default_tts_model: String,
    #[arg(long, env = "TTS_LANGUAGE", default_value = VoiceConfig::DEFAULT_LANGUAGE)]
    pub tts_language: String,
    #[arg(long, env = "TTS_AUDIO_ENCODING", default_value = VoiceConfig::DEFAULT_ENCODING)]
    pub tts_audio_encoding: String,

    /// Sentences generation may run ahead of speech
    #[arg(long, env = "UNIT_QUEUE_CAPACITY", default_value_t = PipelineOptions::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    /// Split unpunctuated text after this many characters
    #[arg(long, env = "MAX_UNIT_CHARS", default_value_t = lingproc::DEFAULT_MAX_UNIT_CHARS)]
    pub max_unit_chars: usize,
    /// Deadline for single-shot generation and synthesis calls
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,
    /// Fail the narrative when the stream is silent this long
    #[arg(long, env = "STREAM_IDLE_TIMEOUT_SECS", default_value_t = 30)]
    pub stream_idle_timeout_secs: u64,
}

impl Config {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn models(&self) -> ModelNames {
        ModelNames {
            story: self.story_model.clone(),
            image: self.image_model.clone(),
            summary: self.summary_model.clone(),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            queue_capacity: self.queue_capacity,
            max_unit_chars: self.max_unit_chars,
            stream_idle_timeout: secs(self.stream_idle_timeout_secs),
            language_code: self.tts_language.clone(),
            audio_encoding: self.tts_audio_encoding.clone(),
        }
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            voice: self.default_voice.clone(),
            tts_model: self.default_tts_model.clone(),
        }
    }

    pub fn tts_key(&self) -> Option<&str> {
        let non_empty = |k: &&str| !k.is_empty();
        self.tts_api_key
            .as_deref()
            .filter(non_empty)
            .or_else(|| self.gemini_api_key.as_deref().filter(non_empty))
    }

    /// Build the service, or `None` when no Gemini key is configured.
    pub fn storyteller(&self) -> Option<Storyteller> {
        let gemini_key = self.gemini_api_key.as_deref().filter(|k| !k.is_empty())?;
        let tts_key = self.tts_key().unwrap_or(gemini_key);
        let mut gemini = GeminiClient::new(&self.gemini_base_url, gemini_key);
        let mut tts = GoogleTts::new(&self.tts_base_url, tts_key);
        if let Some(timeout) = secs(self.request_timeout_secs) {
            gemini = gemini.with_request_timeout(timeout);
            tts = tts.with_timeout(timeout);
        }
        Some(
            Storyteller::new(Arc::new(gemini), Arc::new(tts), self.models())
                .with_options(self.pipeline_options()),
        )
    }
}

/// Zero disables the limit.
fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}
