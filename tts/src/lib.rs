//! Speech synthesis sessions.
//!
//! A [`Synthesizer`] opens one [`SynthesisSession`] per piece of text. The
//! session protocol is fixed: one [`SynthesisRequest::Config`], then the
//! text, then [`SynthesisSession::close_send`], then
//! [`SynthesisSession::recv`] until it yields `None`. [`GoogleTts`] speaks
//! this protocol on top of the Cloud Text-to-Speech REST API.

use async_trait::async_trait;
use thiserror::Error;

pub mod google;

pub use google::GoogleTts;

#[derive(Debug, Error)]
pub enum TTSError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("synthesis server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("session protocol violated: {0}")]
    Protocol(&'static str),
}

/// Convenience result type used throughout this crate.
pub type Result<T> = std::result::Result<T, TTSError>;

/// Voice selection sent at the start of every session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceConfig {
    pub voice: String,
    pub model: String,
    pub language_code: String,
    pub audio_encoding: String,
}

impl VoiceConfig {
    pub const DEFAULT_LANGUAGE: &'static str = "en-US";
    pub const DEFAULT_ENCODING: &'static str = "LINEAR16";

    pub fn new(voice: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            model: model.into(),
            language_code: Self::DEFAULT_LANGUAGE.into(),
            audio_encoding: Self::DEFAULT_ENCODING.into(),
        }
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language_code = code.into();
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.audio_encoding = encoding.into();
        self
    }
}

/// Message sent from the client side of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisRequest {
    Config(VoiceConfig),
    Text(String),
}

/// One streaming synthesis exchange.
#[async_trait]
pub trait SynthesisSession: Send {
    async fn send(&mut self, request: SynthesisRequest) -> Result<()>;

    /// Signal that no more input follows.
    async fn close_send(&mut self) -> Result<()>;

    /// Next audio chunk, or `None` once the session has ended.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Text-to-speech engine interface.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn open(&self) -> Result<Box<dyn SynthesisSession>>;
}
