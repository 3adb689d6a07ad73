use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use llm::{GenerationOptions, LLMClient};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::events::StoryEvent;
use crate::multiplexer::Multiplexer;
use crate::prompt;

/// Start the illustration call in the background.
///
/// Failures are logged and dropped; the handle only serves to abort it.
pub(crate) fn spawn(
    llm: Arc<dyn LLMClient>,
    model: String,
    topic: String,
    mux: Multiplexer,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = illustrate(llm.as_ref(), &model, &topic, &mux).await {
            warn!(error = %e, "illustration failed");
        }
    })
}

async fn illustrate(
    llm: &dyn LLMClient,
    model: &str,
    topic: &str,
    mux: &Multiplexer,
) -> anyhow::Result<()> {
    let prompt = prompt::image_prompt(topic);
    info!(%model, %prompt, "generating illustration");
    let generation = llm.generate(model, &prompt, GenerationOptions::image()).await?;
    let image = generation.inline_data()?;
    info!(bytes = image.len(), "illustration generated");
    let content = general_purpose::STANDARD.encode(image);
    mux.send(&StoryEvent::Image { content }).await?;
    Ok(())
}
