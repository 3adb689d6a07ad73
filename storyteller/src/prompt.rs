//! Prompt templates for the generative calls.

use indoc::formatdoc;

/// Prompt for the streamed narrative.
///
/// The first line of the answer is expected to be `Title: ...`.
pub fn story_prompt(topic: &str, context: Option<&str>) -> String {
    let continuation = match context {
        Some(ctx) if !ctx.is_empty() => format!(
            "Previous Story Context: {ctx}\nContinue the story naturally from this context."
        ),
        _ => String::new(),
    };
    formatdoc! {"
        You are a master storyteller.
        Your audience is listening to this story, so use evocative language, clear imagery, and a natural rhythm.
        Topic: {topic}
        {continuation}

        Instructions:
        1. First, provide a creative Title for the story in the format: \"Title: [Your Title]\".
        2. Then, tell the story (approx. 150 words).
        3. Focus on sensory details (sight, sound, smell).
        4. Ensure a clear narrative arc with a satisfying conclusion.
        5. Avoid markdown formatting (like bold or italics) as this is for TTS.
    "}
}

pub fn image_prompt(topic: &str) -> String {
    format!(
        "A cinematic, storybook illustration for a story about: {topic}. High contrast, magical atmosphere."
    )
}

/// Prompt merging the previous summary with a newly told segment.
pub fn summary_prompt(previous: Option<&str>, segment: &str) -> String {
    let previous = previous.unwrap_or_default();
    formatdoc! {"
        Summarize the following story segment, merging it with the previous context.
        Keep key characters, current location, and plot points concise (max 100 words).
        Previous Context: {previous}
        New Segment: {segment}
    "}
}

pub fn suggestions_prompt(summary: &str) -> String {
    formatdoc! {"
        Based on this story summary: \"{summary}\", suggest 3 short, intriguing plot continuations or user actions.
        Keep them under 10 words each.
        Format: JSON list of strings. Example: [\"Open the door\", \"Run away\"]
    "}
}
