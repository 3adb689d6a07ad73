use llm::{GenerationOptions, LLMClient, LLMError};
use tracing::{info, warn};

use crate::events::StoryEvent;
use crate::multiplexer::{MuxError, Multiplexer};
use crate::prompt;

/// Suggestion sent when the model's answer cannot be used.
pub const FALLBACK_SUGGESTION: &str = "Continue...";

/// Summarize the finished narrative, then suggest continuations.
///
/// A failed summary ends the stage silently. Once a summary exists exactly
/// one suggestions event follows it. Only write failures are returned.
pub(crate) async fn run(
    llm: &dyn LLMClient,
    model: &str,
    previous: Option<&str>,
    narrative: &str,
    mux: &Multiplexer,
) -> Result<(), MuxError> {
    let summary = match summarize(llm, model, previous, narrative).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "summarization failed");
            return Ok(());
        }
    };
    info!(%summary, "story context updated");
    mux.send(&StoryEvent::Context {
        content: summary.clone(),
    })
    .await?;
    let data = suggest(llm, model, &summary).await;
    info!(?data, "suggestions");
    mux.send(&StoryEvent::Suggestions { data }).await
}

async fn summarize(
    llm: &dyn LLMClient,
    model: &str,
    previous: Option<&str>,
    narrative: &str,
) -> Result<String, LLMError> {
    info!(%model, "summarizing story");
    let prompt = prompt::summary_prompt(previous, narrative);
    let generation = llm
        .generate(model, &prompt, GenerationOptions::default())
        .await?;
    Ok(generation.text()?.trim().to_string())
}

async fn suggest(llm: &dyn LLMClient, model: &str, summary: &str) -> Vec<String> {
    info!(%model, "generating suggestions");
    let prompt = prompt::suggestions_prompt(summary);
    let text = match llm.generate(model, &prompt, GenerationOptions::json()).await {
        Ok(generation) => generation.text().map(str::to_string),
        Err(e) => Err(e),
    };
    match text {
        Ok(text) => parse_suggestions(&text).unwrap_or_else(|| {
            warn!(%text, "suggestions are not a JSON list");
            fallback()
        }),
        Err(e) => {
            warn!(error = %e, "suggestion generation failed");
            fallback()
        }
    }
}

fn fallback() -> Vec<String> {
    vec![FALLBACK_SUGGESTION.to_string()]
}

/// Parse a JSON list of strings, tolerating a surrounding code fence.
pub fn parse_suggestions(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    serde_json::from_str(text.trim()).ok()
}
