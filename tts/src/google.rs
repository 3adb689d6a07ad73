//! Cloud Text-to-Speech client.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Result, SynthesisRequest, SynthesisSession, Synthesizer, TTSError, VoiceConfig};

/// Public Cloud Text-to-Speech endpoint.
pub const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Client for the Cloud Text-to-Speech `text:synthesize` endpoint.
///
/// Each session buffers its config and text, performs one request when the
/// input is closed, and hands the decoded audio back in chunks of at most
/// `chunk_bytes`.
#[derive(Clone)]
pub struct GoogleTts {
    base_url: String,
    api_key: String,
    client: Client,
    timeout: Option<Duration>,
    chunk_bytes: usize,
}

impl GoogleTts {
    pub const DEFAULT_CHUNK_BYTES: usize = 32 * 1024;

    /// Create a client targeting `base_url` (e.g. [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
            timeout: None,
            chunk_bytes: Self::DEFAULT_CHUNK_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    async fn synthesize(&self, config: &VoiceConfig, text: &str) -> Result<Vec<u8>> {
        let body = SynthesizeRequest {
            input: Input { text },
            voice: Voice {
                language_code: &config.language_code,
                name: &config.voice,
                model_name: &config.model,
            },
            audio_config: AudioConfig {
                audio_encoding: &config.audio_encoding,
            },
        };
        info!(voice = %config.voice, model = %config.model, chars = text.chars().count(), "requesting TTS");
        let mut req = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(t) = self.timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TTSError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: SynthesizeResponse = resp
            .json()
            .await
            .map_err(|e| TTSError::InvalidResponse(e.to_string()))?;
        general_purpose::STANDARD
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| TTSError::InvalidResponse(format!("audio content: {e}")))
    }
}

#[async_trait]
impl Synthesizer for GoogleTts {
    async fn open(&self) -> Result<Box<dyn SynthesisSession>> {
        Ok(Box::new(GoogleTtsSession {
            tts: self.clone(),
            state: SessionState::AwaitingConfig,
        }))
    }
}

enum SessionState {
    AwaitingConfig,
    Collecting { config: VoiceConfig, text: String },
    Draining(VecDeque<Vec<u8>>),
}

struct GoogleTtsSession {
    tts: GoogleTts,
    state: SessionState,
}

#[async_trait]
impl SynthesisSession for GoogleTtsSession {
    async fn send(&mut self, request: SynthesisRequest) -> Result<()> {
        match request {
            SynthesisRequest::Config(config) => match self.state {
                SessionState::AwaitingConfig => {
                    self.state = SessionState::Collecting {
                        config,
                        text: String::new(),
                    };
                    Ok(())
                }
                SessionState::Collecting { .. } => Err(TTSError::Protocol("config sent twice")),
                SessionState::Draining(_) => Err(TTSError::Protocol("send after close")),
            },
            SynthesisRequest::Text(more) => match &mut self.state {
                SessionState::Collecting { text, .. } => {
                    text.push_str(&more);
                    Ok(())
                }
                SessionState::AwaitingConfig => Err(TTSError::Protocol("text sent before config")),
                SessionState::Draining(_) => Err(TTSError::Protocol("send after close")),
            },
        }
    }

    async fn close_send(&mut self) -> Result<()> {
        let (config, text) = match std::mem::replace(
            &mut self.state,
            SessionState::Draining(VecDeque::new()),
        ) {
            SessionState::Collecting { config, text } => (config, text),
            SessionState::AwaitingConfig => return Err(TTSError::Protocol("closed without config")),
            SessionState::Draining(_) => return Err(TTSError::Protocol("closed twice")),
        };
        let audio = self.tts.synthesize(&config, &text).await?;
        debug!(bytes = audio.len(), "audio received");
        let chunks = audio
            .chunks(self.tts.chunk_bytes)
            .map(<[u8]>::to_vec)
            .collect();
        self.state = SessionState::Draining(chunks);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.state {
            SessionState::Draining(chunks) => Ok(chunks.pop_front()),
            _ => Err(TTSError::Protocol("recv before close")),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: Input<'a>,
    voice: Voice<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Serialize)]
struct Input<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Voice<'a> {
    language_code: &'a str,
    name: &'a str,
    model_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}
