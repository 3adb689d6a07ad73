//! Abstractions for interacting with generative model servers.
//!
//! The `llm` crate defines the [`LLMClient`] trait used by the storyteller
//! for streamed narrative text and single-shot generations (summaries,
//! suggestions, illustrations), along with [`GeminiClient`], an
//! implementation backed by the Gemini REST API.

pub mod gemini;
mod sse;
pub mod traits;

pub use gemini::GeminiClient;
pub use traits::{Generation, GenerationOptions, LLMClient, LLMError, Part, TextStream};
