//! Stateful story segmenter.
//!
//! Language model output arrives in fragments whose boundaries carry no
//! meaning. [`StorySegmenter`] buffers those fragments and promotes complete
//! pieces to [`Unit`]s as soon as a split point is known:
//!
//! - a buffer starting with `"Title: "` that contains a line break yields a
//!   [`Unit::Title`] for the text before the break;
//! - the first `.`, `?` or `!` in the buffer ends a [`Unit::Sentence`]
//!   (terminator included);
//! - a buffer holding at least [`DEFAULT_MAX_UNIT_CHARS`] characters with no
//!   terminator is cut at the last space inside that limit, or at the limit.
//!
//! Punctuation always wins over the length fallback, even when it produces a
//! very short sentence.

use tracing::trace;

/// Marker that introduces the title line of a story.
pub const TITLE_PREFIX: &str = "Title: ";

/// Characters buffered without punctuation before a forced split.
pub const DEFAULT_MAX_UNIT_CHARS: usize = 200;

const TERMINATORS: [char; 3] = ['.', '?', '!'];

/// A segmented piece of narrative ready for display and synthesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unit {
    Title(String),
    Sentence(String),
}

impl Unit {
    /// Text carried by the unit.
    pub fn text(&self) -> &str {
        match self {
            Unit::Title(t) | Unit::Sentence(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Unit::Title(t) | Unit::Sentence(t) => t,
        }
    }
}

/// Incremental title/sentence segmenter.
///
/// Feed fragments with [`feed`](Self::feed) and collect the units each call
/// completes. Call [`flush`](Self::flush) once the source ends to emit the
/// residual buffer.
///
/// ```
/// use lingproc::{StorySegmenter, Unit};
///
/// let mut seg = StorySegmenter::new();
/// let units = seg.feed("Title: Foo\nBar. Baz.");
/// assert_eq!(
///     units,
///     vec![
///         Unit::Title("Foo".into()),
///         Unit::Sentence("Bar.".into()),
///         Unit::Sentence("Baz.".into()),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct StorySegmenter {
    buf: String,
    max_unit_chars: usize,
}

impl Default for StorySegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl StorySegmenter {
    /// Create a segmenter using [`DEFAULT_MAX_UNIT_CHARS`].
    pub fn new() -> Self {
        Self::with_max_unit_chars(DEFAULT_MAX_UNIT_CHARS)
    }

    /// Create a segmenter with a custom length fallback. Zero is treated as one.
    pub fn with_max_unit_chars(max_unit_chars: usize) -> Self {
        Self {
            buf: String::new(),
            max_unit_chars: max_unit_chars.max(1),
        }
    }

    pub fn max_unit_chars(&self) -> usize {
        self.max_unit_chars
    }

    /// Text received but not yet promoted to a unit.
    pub fn buffered(&self) -> &str {
        &self.buf
    }

    /// Append `fragment` and return every unit it completes, in order.
    pub fn feed(&mut self, fragment: &str) -> Vec<Unit> {
        self.buf.push_str(fragment);
        let mut units = Vec::new();

        if let Some((title, rest)) = split_title_line(&self.buf) {
            units.push(Unit::Title(title));
            self.buf = rest;
        }

        while let Some(at) = self.split_point() {
            let rest = self.buf.split_off(at);
            let piece = std::mem::replace(&mut self.buf, rest);
            let sentence = piece.trim();
            if sentence.is_empty() {
                continue;
            }
            push_unit(sentence, &mut units);
        }
        units
    }

    /// Emit whatever remains in the buffer once the source has ended.
    ///
    /// The residual text gets the same title check as extracted sentences,
    /// so this yields at most a title followed by one sentence.
    pub fn flush(&mut self) -> Vec<Unit> {
        let rest = std::mem::take(&mut self.buf);
        let mut units = Vec::new();
        let rest = rest.trim();
        if !rest.is_empty() {
            push_unit(rest, &mut units);
        }
        units
    }

    /// Byte index one past the end of the next unit, if one is complete.
    fn split_point(&self) -> Option<usize> {
        if let Some(idx) = self.buf.find(TERMINATORS) {
            return Some(idx + 1);
        }
        let (idx, ch) = self.buf.char_indices().nth(self.max_unit_chars - 1)?;
        let limit = idx + ch.len_utf8();
        match self.buf[..limit].rfind(' ') {
            Some(space) if space > 0 => Some(space),
            _ => Some(limit),
        }
    }
}

/// Split a leading `Title:` line off `text`, returning the title and the rest.
fn split_title_line(text: &str) -> Option<(String, String)> {
    if !text.starts_with(TITLE_PREFIX) {
        return None;
    }
    let (line, rest) = text.split_once('\n')?;
    Some((clean_title(line), rest.to_string()))
}

fn clean_title(line: &str) -> String {
    line.strip_prefix(TITLE_PREFIX)
        .unwrap_or(line)
        .trim()
        .to_string()
}

/// Push a trimmed, non-empty slice as a sentence, diverting a title marker
/// that reached sentence extraction (its line break arrived late).
fn push_unit(sentence: &str, units: &mut Vec<Unit>) {
    if sentence.starts_with(TITLE_PREFIX) {
        let (line, rest) = sentence.split_once('\n').unwrap_or((sentence, ""));
        let title = clean_title(line);
        trace!(%title, "title found during sentence extraction");
        units.push(Unit::Title(title));
        let rest = rest.trim();
        if !rest.is_empty() {
            units.push(Unit::Sentence(rest.to_string()));
        }
        return;
    }
    trace!(%sentence, "sentence segmented");
    units.push(Unit::Sentence(sentence.to_string()));
}

/// Segment a complete block of `text`, flushing the residual buffer.
///
/// ```
/// use lingproc::{segment_story_text, Unit};
///
/// let units = segment_story_text("Hello world. How are you?");
/// assert_eq!(
///     units,
///     vec![
///         Unit::Sentence("Hello world.".into()),
///         Unit::Sentence("How are you?".into()),
///     ]
/// );
/// ```
pub fn segment_story_text(text: &str) -> Vec<Unit> {
    let mut seg = StorySegmenter::new();
    let mut out = seg.feed(text);
    out.extend(seg.flush());
    out
}
