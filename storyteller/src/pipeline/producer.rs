use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lingproc::{StorySegmenter, Unit};
use llm::LLMClient;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::StoryError;
use crate::events::StoryEvent;
use crate::multiplexer::Multiplexer;

/// Drives the narrative stream through the segmenter.
///
/// Titles and sentences are written to the client as soon as they are cut;
/// sentences are also queued for synthesis. Pushing onto the full queue
/// blocks until the consumer catches up.
pub(crate) struct Producer {
    pub(crate) llm: Arc<dyn LLMClient>,
    pub(crate) model: String,
    pub(crate) mux: Multiplexer,
    pub(crate) max_unit_chars: usize,
    pub(crate) idle_timeout: Option<Duration>,
}

impl Producer {
    /// Run to the end of the stream and return the raw narrative text.
    ///
    /// `units` is dropped on return, which closes the queue on success and
    /// on failure alike.
    pub(crate) async fn run(
        self,
        prompt: String,
        units: mpsc::Sender<String>,
    ) -> Result<String, StoryError> {
        let mut stream = self.llm.stream_text(&self.model, &prompt).await?;
        let mut segmenter = StorySegmenter::with_max_unit_chars(self.max_unit_chars);
        let mut narrative = String::new();
        loop {
            let next = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, stream.next())
                    .await
                    .map_err(|_| {
                        warn!(?limit, "narrative stream stalled");
                        StoryError::Stalled(limit)
                    })?,
                None => stream.next().await,
            };
            let Some(fragment) = next else { break };
            let fragment = fragment.inspect_err(|e| warn!(error = %e, "narrative stream failed"))?;
            debug!(%fragment, "fragment received");
            narrative.push_str(&fragment);
            for unit in segmenter.feed(&fragment) {
                self.forward(unit, &units).await?;
            }
        }
        for unit in segmenter.flush() {
            self.forward(unit, &units).await?;
        }
        info!(chars = narrative.chars().count(), "narrative stream finished");
        Ok(narrative)
    }

    async fn forward(&self, unit: Unit, units: &mpsc::Sender<String>) -> Result<(), StoryError> {
        match unit {
            Unit::Title(title) => {
                info!(%title, "title");
                self.mux.send(&StoryEvent::Title { content: title }).await?;
            }
            Unit::Sentence(sentence) => {
                info!(%sentence, "sentence");
                self.mux
                    .send(&StoryEvent::Sentence {
                        content: sentence.clone(),
                    })
                    .await?;
                units
                    .send(sentence)
                    .await
                    .map_err(|_| StoryError::QueueClosed)?;
            }
        }
        Ok(())
    }
}
