#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::UnboundedReceiver;
use llm::{Generation, GenerationOptions, LLMClient, LLMError, Part, TextStream};
use storyteller::{Frame, ModelNames, StoryEvent, StoryRequest};
use tokio::sync::Semaphore;
use tts::{SynthesisRequest, SynthesisSession, Synthesizer, TTSError, VoiceConfig};

pub enum ImageScript {
    Bytes(Vec<u8>),
    Fail,
    Hang,
    /// Call `n` waits `delays[n].0` and returns `delays[n].1`.
    Delayed(Vec<(Duration, Vec<u8>)>),
}

/// Text generator answering from a fixed script.
pub struct ScriptedLlm {
    /// `Err` items become network errors mid-stream.
    pub fragments: Vec<Result<String, String>>,
    /// Keep the stream open without further fragments.
    pub stall: bool,
    pub image: ImageScript,
    /// `None` makes the call fail.
    pub summary: Option<String>,
    pub suggestions: Option<String>,
    /// `(model, prompt)` of every call, in order.
    pub calls: Mutex<Vec<(String, String)>>,
    image_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            stall: false,
            image: ImageScript::Bytes(b"png".to_vec()),
            summary: Some("A fox ran and hid.".into()),
            suggestions: Some(r#"["Follow the fox", "Go home"]"#.into()),
            calls: Mutex::new(Vec::new()),
            image_calls: AtomicUsize::new(0),
        }
    }

    pub fn prompt_for(&self, model: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == model)
            .map(|(_, p)| p.clone())
    }

    fn record(&self, model: &str, prompt: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
    }
}

fn text(reply: &Option<String>) -> Result<Generation, LLMError> {
    match reply {
        Some(t) => Ok(Generation {
            parts: vec![Part::Text(t.clone())],
        }),
        None => Err(LLMError::Status {
            status: 500,
            body: "scripted failure".into(),
        }),
    }
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn stream_text(&self, model: &str, prompt: &str) -> Result<TextStream, LLMError> {
        self.record(model, prompt);
        let items: Vec<Result<String, LLMError>> = self
            .fragments
            .iter()
            .map(|f| f.clone().map_err(LLMError::Network))
            .collect();
        let stream = tokio_stream::iter(items);
        if self.stall {
            Ok(Box::pin(stream.chain(futures::stream::pending())))
        } else {
            Ok(Box::pin(stream))
        }
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<Generation, LLMError> {
        self.record(model, prompt);
        if options == GenerationOptions::image() {
            match &self.image {
                ImageScript::Bytes(data) => Ok(Generation {
                    parts: vec![Part::InlineData {
                        mime_type: "image/png".into(),
                        data: data.clone(),
                    }],
                }),
                ImageScript::Fail => Err(LLMError::NoInlineData),
                ImageScript::Hang => futures::future::pending().await,
                ImageScript::Delayed(script) => {
                    let n = self.image_calls.fetch_add(1, Ordering::SeqCst);
                    let (delay, data) = script[n.min(script.len() - 1)].clone();
                    tokio::time::sleep(delay).await;
                    Ok(Generation {
                        parts: vec![Part::InlineData {
                            mime_type: "image/png".into(),
                            data,
                        }],
                    })
                }
            }
        } else if options == GenerationOptions::json() {
            text(&self.suggestions)
        } else {
            text(&self.summary)
        }
    }
}

/// Synthesizer returning `"<text>#0"`, `"<text>#1"` and an empty chunk.
#[derive(Default)]
pub struct ScriptedTts {
    /// Sessions for this text fail on close.
    pub fail_on: Option<String>,
    /// When set, every close waits for a permit.
    pub gate: Option<Arc<Semaphore>>,
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub configs: Arc<Mutex<Vec<VoiceConfig>>>,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
}

impl ScriptedTts {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedTts {
    async fn open(&self) -> Result<Box<dyn SynthesisSession>, TTSError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            fail_on: self.fail_on.clone(),
            gate: self.gate.clone(),
            spoken: self.spoken.clone(),
            configs: self.configs.clone(),
            active: self.active.clone(),
            text: String::new(),
            chunks: Vec::new(),
        }))
    }
}

struct ScriptedSession {
    fail_on: Option<String>,
    gate: Option<Arc<Semaphore>>,
    spoken: Arc<Mutex<Vec<String>>>,
    configs: Arc<Mutex<Vec<VoiceConfig>>>,
    active: Arc<AtomicUsize>,
    text: String,
    chunks: Vec<Vec<u8>>,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SynthesisSession for ScriptedSession {
    async fn send(&mut self, request: SynthesisRequest) -> Result<(), TTSError> {
        match request {
            SynthesisRequest::Config(config) => self.configs.lock().unwrap().push(config),
            SynthesisRequest::Text(text) => self.text.push_str(&text),
        }
        Ok(())
    }

    async fn close_send(&mut self) -> Result<(), TTSError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.spoken.lock().unwrap().push(self.text.clone());
        if self.fail_on.as_deref() == Some(self.text.as_str()) {
            return Err(TTSError::Status {
                status: 500,
                body: "scripted failure".into(),
            });
        }
        self.chunks = vec![
            Vec::new(),
            format!("{}#1", self.text).into_bytes(),
            format!("{}#0", self.text).into_bytes(),
        ];
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TTSError> {
        Ok(self.chunks.pop())
    }
}

pub fn models() -> ModelNames {
    ModelNames {
        story: "story".into(),
        image: "image".into(),
        summary: "summary".into(),
    }
}

pub fn request(topic: &str) -> StoryRequest {
    StoryRequest {
        topic: topic.into(),
        voice: "Puck".into(),
        tts_model: "flash-tts".into(),
        context: None,
    }
}

/// Frames written so far, without waiting.
pub fn drain(rx: &mut UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(Some(frame)) = rx.try_next() {
        frames.push(frame);
    }
    frames
}

/// Every frame until all writers are gone.
pub async fn collect(rx: UnboundedReceiver<Frame>) -> Vec<Frame> {
    tokio::time::timeout(Duration::from_secs(5), rx.collect())
        .await
        .expect("multiplexer writers still alive")
}

pub fn events(frames: &[Frame]) -> Vec<StoryEvent> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Text(t) => Some(serde_json::from_str(t).unwrap()),
            Frame::Binary(_) => None,
        })
        .collect()
}

pub fn audio(frames: &[Frame]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Binary(b) => Some(String::from_utf8(b.clone()).unwrap()),
            Frame::Text(_) => None,
        })
        .collect()
}

pub fn sentences(events: &[StoryEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StoryEvent::Sentence { content } => Some(content.clone()),
            _ => None,
        })
        .collect()
}

/// Events other than the illustration, whose position is unordered.
pub fn without_image(events: Vec<StoryEvent>) -> Vec<StoryEvent> {
    events
        .into_iter()
        .filter(|e| !matches!(e, StoryEvent::Image { .. }))
        .collect()
}
