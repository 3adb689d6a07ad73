//! Minimal server-sent events decoder for streamed generations.
//!
//! Only `data:` fields are kept; comments and other fields are ignored.
//! Bytes are buffered until a full line is available so multi-byte
//! characters split across network chunks decode correctly.

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    line: Vec<u8>,
    data: String,
}

impl SseDecoder {
    /// Feed raw bytes and return the payloads of every completed event.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.line.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.line.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.line.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.handle_line(line.trim_end_matches(&['\r', '\n'][..]), &mut events);
        }
        events
    }

    /// Flush a trailing event left open when the body ended.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let mut events = Vec::new();
        if !self.line.is_empty() {
            let raw = std::mem::take(&mut self.line);
            let line = String::from_utf8_lossy(&raw);
            self.handle_line(line.trim_end_matches('\r'), &mut events);
        }
        self.handle_line("", &mut events);
        events.pop()
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(std::mem::take(&mut self.data));
            }
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }
}
