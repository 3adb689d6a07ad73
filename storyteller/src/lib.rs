//! Streams a generated story to a websocket client.
//!
//! A [`Storyteller`] turns one [`StoryRequest`] into a sequence of
//! [`StoryEvent`]s and raw audio frames written through a shared
//! [`Multiplexer`]. The [`web`] module exposes it over axum.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod multiplexer;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod web;

pub use config::Config;
pub use error::StoryError;
pub use events::StoryEvent;
pub use logging::init_logging;
pub use multiplexer::{Frame, MuxError, Multiplexer};
pub use pipeline::{
    FALLBACK_SUGGESTION, ModelNames, PipelineOptions, StorySession, Storyteller, parse_suggestions,
};
pub use request::{RequestDefaults, RequestMessage, StoryRequest};
pub use web::{AppState, app};
