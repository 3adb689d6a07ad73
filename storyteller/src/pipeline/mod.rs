//! The per-request story pipeline.
//!
//! One [`Storyteller::tell`] call runs:
//!
//! - the illustration task, detached, writing at most one image event;
//! - the producer, spawned, cutting the narrative stream into units and
//!   pushing sentences onto a bounded queue;
//! - the consumer, on the calling task, speaking queued sentences in order;
//! - the context task, after both of the above succeed.

mod consumer;
mod context;
mod illustration;
mod producer;

use std::sync::Arc;
use std::time::Duration;

use lingproc::DEFAULT_MAX_UNIT_CHARS;
use llm::LLMClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use tts::{Synthesizer, VoiceConfig};

pub use context::{FALLBACK_SUGGESTION, parse_suggestions};

use crate::error::StoryError;
use crate::multiplexer::Multiplexer;
use crate::prompt;
use crate::request::StoryRequest;
use consumer::Consumer;
use producer::Producer;

/// Generative models used by each stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelNames {
    pub story: String,
    pub image: String,
    pub summary: String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            story: "gemini-3-pro-preview".into(),
            image: "gemini-3-pro-image-preview".into(),
            summary: "gemini-2.5-flash-preview-09-2025".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Sentences the producer may run ahead of synthesis.
    pub queue_capacity: usize,
    pub max_unit_chars: usize,
    /// Fail the narrative when no fragment arrives for this long.
    pub stream_idle_timeout: Option<Duration>,
    pub language_code: String,
    pub audio_encoding: String,
}

impl PipelineOptions {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            max_unit_chars: DEFAULT_MAX_UNIT_CHARS,
            stream_idle_timeout: None,
            language_code: VoiceConfig::DEFAULT_LANGUAGE.into(),
            audio_encoding: VoiceConfig::DEFAULT_ENCODING.into(),
        }
    }
}

/// Runs story requests against a text generator and a synthesizer.
pub struct Storyteller {
    llm: Arc<dyn LLMClient>,
    tts: Arc<dyn Synthesizer>,
    models: ModelNames,
    options: PipelineOptions,
}

impl Storyteller {
    pub fn new(llm: Arc<dyn LLMClient>, tts: Arc<dyn Synthesizer>, models: ModelNames) -> Self {
        Self {
            llm,
            tts,
            models,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Tell one story through `mux`.
    ///
    /// Returns once every queued sentence has been spoken and the context
    /// stage has finished. The illustration is detached and may still be in
    /// flight; use a [`StorySession`] when more stories follow on the same
    /// connection.
    pub async fn tell(&self, request: StoryRequest, mux: Multiplexer) -> Result<(), StoryError> {
        drop(self.illustrate(&request, &mux));
        self.narrate(request, mux).await
    }

    fn illustrate(&self, request: &StoryRequest, mux: &Multiplexer) -> JoinHandle<()> {
        illustration::spawn(
            self.llm.clone(),
            self.models.image.clone(),
            request.topic.clone(),
            mux.clone(),
        )
    }

    async fn narrate(&self, request: StoryRequest, mux: Multiplexer) -> Result<(), StoryError> {
        info!(
            topic = %request.topic,
            voice = %request.voice,
            tts_model = %request.tts_model,
            "starting story"
        );
        let (units_tx, units_rx) = mpsc::channel(self.options.queue_capacity.max(1));
        let prompt = prompt::story_prompt(&request.topic, request.context.as_deref());
        debug!(%prompt, "story prompt");
        let producer = Producer {
            llm: self.llm.clone(),
            model: self.models.story.clone(),
            mux: mux.clone(),
            max_unit_chars: self.options.max_unit_chars,
            idle_timeout: self.options.stream_idle_timeout,
        };
        let narrative = tokio::spawn(producer.run(prompt, units_tx));

        let consumer = Consumer {
            tts: self.tts.clone(),
            voice: self.voice_config(&request),
            mux: mux.clone(),
        };
        let spoken = match consumer.drain(units_rx).await {
            Ok(spoken) => spoken,
            Err(e) => {
                narrative.abort();
                return Err(e);
            }
        };
        // The queue also closes when the producer fails.
        let narrative = narrative
            .await
            .map_err(|e| StoryError::Task(e.to_string()))??;
        info!(sentences = spoken, "narration finished");

        context::run(
            self.llm.as_ref(),
            &self.models.summary,
            request.context.as_deref(),
            &narrative,
            &mux,
        )
        .await?;
        info!("story finished");
        Ok(())
    }

    fn voice_config(&self, request: &StoryRequest) -> VoiceConfig {
        VoiceConfig::new(&request.voice, &request.tts_model)
            .with_language(&self.options.language_code)
            .with_encoding(&self.options.audio_encoding)
    }
}

/// Consecutive stories on one connection.
///
/// An image still being generated for the previous story is abandoned when
/// the next one starts, so it never lands in the wrong story. Dropping the
/// session abandons it too.
pub struct StorySession {
    storyteller: Arc<Storyteller>,
    mux: Multiplexer,
    illustration: Option<JoinHandle<()>>,
}

impl StorySession {
    pub fn new(storyteller: Arc<Storyteller>, mux: Multiplexer) -> Self {
        Self {
            storyteller,
            mux,
            illustration: None,
        }
    }

    pub async fn tell(&mut self, request: StoryRequest) -> Result<(), StoryError> {
        self.abandon_illustration();
        self.illustration = Some(self.storyteller.illustrate(&request, &self.mux));
        self.storyteller.narrate(request, self.mux.clone()).await
    }

    fn abandon_illustration(&mut self) {
        if let Some(task) = self.illustration.take() {
            if !task.is_finished() {
                debug!("abandoning unfinished illustration");
            }
            task.abort();
        }
    }
}

impl Drop for StorySession {
    fn drop(&mut self) {
        self.abandon_illustration();
    }
}
