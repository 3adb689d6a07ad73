use std::time::Duration;

use llm::LLMError;
use thiserror::Error;
use tts::TTSError;

use crate::multiplexer::MuxError;

/// Fatal outcome of one story request.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("connection write failed: {0}")]
    Transport(#[from] MuxError),
    #[error("narrative stream failed: {0}")]
    Narrative(#[from] LLMError),
    #[error("narrative stream stalled for {0:?}")]
    Stalled(Duration),
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] TTSError),
    #[error("unit queue closed before the narrative finished")]
    QueueClosed,
    #[error("narrative task ended abnormally: {0}")]
    Task(String),
}

impl StoryError {
    /// Whether the connection itself is unusable.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoryError::Transport(_))
    }
}
