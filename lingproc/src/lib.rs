//! Linguistic processing utilities.
//!
//! This crate turns streamed language model output into speakable units.
//! [`StorySegmenter`] recognises a leading `Title:` line and then cuts the
//! remaining text into sentences as fragments arrive.

pub mod segmenter;

pub use crate::segmenter::*;
