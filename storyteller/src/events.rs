//! Outbound JSON events.

use serde::{Deserialize, Serialize};

/// Text event written to the client.
///
/// Audio is not an event; it travels as raw binary frames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoryEvent {
    Title { content: String },
    Sentence { content: String },
    /// Base64 encoded illustration.
    Image { content: String },
    /// Merged summary of the story so far.
    Context { content: String },
    Suggestions { data: Vec<String> },
}

impl StoryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StoryEvent::Title { .. } => "title",
            StoryEvent::Sentence { .. } => "sentence",
            StoryEvent::Image { .. } => "image",
            StoryEvent::Context { .. } => "context",
            StoryEvent::Suggestions { .. } => "suggestions",
        }
    }
}
