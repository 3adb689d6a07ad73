use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};
use tts::{SynthesisRequest, Synthesizer, VoiceConfig};

use crate::error::StoryError;
use crate::multiplexer::Multiplexer;

/// Speaks queued sentences one session at a time.
pub(crate) struct Consumer {
    pub(crate) tts: Arc<dyn Synthesizer>,
    pub(crate) voice: VoiceConfig,
    pub(crate) mux: Multiplexer,
}

impl Consumer {
    /// Drain `units` until the producer closes the queue.
    ///
    /// The first failure stops the loop; remaining units are never spoken.
    pub(crate) async fn drain(&self, mut units: mpsc::Receiver<String>) -> Result<usize, StoryError> {
        let mut spoken = 0;
        while let Some(text) = units.recv().await {
            self.speak(&text).await?;
            spoken += 1;
        }
        Ok(spoken)
    }

    async fn speak(&self, text: &str) -> Result<(), StoryError> {
        info!(len = text.len(), %text, "speaking sentence");
        let mut session = self.tts.open().await?;
        session
            .send(SynthesisRequest::Config(self.voice.clone()))
            .await?;
        session.send(SynthesisRequest::Text(text.to_string())).await?;
        session.close_send().await?;
        while let Some(chunk) = session.recv().await? {
            if chunk.is_empty() {
                continue;
            }
            debug!(bytes = chunk.len(), "audio chunk");
            self.mux.send_audio(chunk).await?;
        }
        Ok(())
    }
}
