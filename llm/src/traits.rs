use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no content generated")]
    NoContent,
    #[error("no inline image data found")]
    NoInlineData,
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        LLMError::Network(e.to_string())
    }
}

/// Ordered text fragments from a streaming generation.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// Response shaping for a single-shot generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Output modalities such as `"IMAGE"`; empty means the model default.
    pub response_modalities: Vec<String>,
    /// MIME type the response text should follow, e.g. `application/json`.
    pub response_mime_type: Option<String>,
}

impl GenerationOptions {
    /// Request image output.
    pub fn image() -> Self {
        Self {
            response_modalities: vec!["IMAGE".into()],
            ..Default::default()
        }
    }

    /// Request a JSON encoded response.
    pub fn json() -> Self {
        Self {
            response_mime_type: Some("application/json".into()),
            ..Default::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// One piece of generated content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Parts of the first candidate returned by a single-shot generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Generation {
    pub parts: Vec<Part>,
}

impl Generation {
    /// The first text part.
    pub fn text(&self) -> Result<&str, LLMError> {
        self.parts
            .iter()
            .find_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .ok_or(LLMError::NoContent)
    }

    /// The first inline binary part.
    ///
    /// Fails with [`LLMError::NoContent`] when nothing was generated and
    /// [`LLMError::NoInlineData`] when only text came back.
    pub fn inline_data(&self) -> Result<&[u8], LLMError> {
        if self.parts.is_empty() {
            return Err(LLMError::NoContent);
        }
        self.parts
            .iter()
            .find_map(|p| match p {
                Part::InlineData { data, .. } => Some(data.as_slice()),
                _ => None,
            })
            .ok_or(LLMError::NoInlineData)
    }
}

#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Stream text for `prompt` as it is generated.
    async fn stream_text(&self, model: &str, prompt: &str) -> Result<TextStream, LLMError>;

    /// Run a single request/response generation.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<Generation, LLMError>;
}
