//! HTTP client for the Gemini `generateContent` REST API.
//!
//! [`GeminiClient`] implements [`LLMClient`]: streamed text goes through
//! `streamGenerateContent?alt=sse`, single-shot requests through
//! `generateContent`. Inline image data is base64 decoded before it is
//! returned.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sse::SseDecoder;
use crate::traits::{Generation, GenerationOptions, LLMClient, LLMError, Part, TextStream};

/// Public Gemini endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    request_timeout: Option<Duration>,
}

impl GeminiClient {
    /// Create a client for `base_url` (e.g. [`DEFAULT_BASE_URL`]) authenticating with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            request_timeout: None,
        }
    }

    /// Bound the total duration of single-shot requests.
    ///
    /// Streams are not covered; their lifetime depends on the generation.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post(
        &self,
        url: String,
        body: &GenerateContentRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, LLMError> {
        let mut req = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body);
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LLMError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn stream_text(&self, model: &str, prompt: &str) -> Result<TextStream, LLMError> {
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        info!(%model, "opening generation stream");
        let options = GenerationOptions::default();
        let body = GenerateContentRequest::new(prompt, &options);
        let resp = self.post(url, &body, None).await?;
        let mut bytes = Box::pin(resp.bytes_stream());
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(LLMError::from(e));
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    match chunk_text(&event) {
                        Ok(text) if text.is_empty() => {}
                        Ok(text) => yield Ok(text),
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if let Some(event) = decoder.finish() {
                match chunk_text(&event) {
                    Ok(text) if text.is_empty() => {}
                    other => yield other,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<Generation, LLMError> {
        let url = self.endpoint(model, "generateContent");
        debug!(%model, ?options, "single-shot generation");
        let body = GenerateContentRequest::new(prompt, &options);
        let resp = self.post(url, &body, self.request_timeout).await?;
        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;
        parsed.into_generation()
    }
}

/// Concatenated text of the first candidate in one streamed chunk.
fn chunk_text(event: &str) -> Result<String, LLMError> {
    let resp: GenerateContentResponse =
        serde_json::from_str(event).map_err(|e| LLMError::InvalidResponse(e.to_string()))?;
    if let Some(error) = resp.error {
        return Err(error.into());
    }
    Ok(resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "no_modalities")]
    response_modalities: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
}

fn no_modalities(m: &&[String]) -> bool {
    m.is_empty()
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str, options: &'a GenerationOptions) -> Self {
        let generation_config = (!options.is_default()).then(|| GenerationConfig {
            response_modalities: &options.response_modalities,
            response_mime_type: options.response_mime_type.as_deref(),
        });
        Self {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config,
        }
    }
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    /// Present when the server fails after the HTTP status was sent.
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

impl From<ApiError> for LLMError {
    fn from(e: ApiError) -> Self {
        LLMError::Status {
            status: e.code,
            body: e.message,
        }
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn into_generation(self) -> Result<Generation, LLMError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(inline) = part.inline_data {
                let data = general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| LLMError::InvalidResponse(format!("inline data: {e}")))?;
                out.push(Part::InlineData {
                    mime_type: inline.mime_type,
                    data,
                });
            } else if let Some(text) = part.text {
                out.push(Part::Text(text));
            }
        }
        Ok(Generation { parts: out })
    }
}
