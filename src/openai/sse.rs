//! SSE line decoding.
//!
//! Extracts `data:` payloads from a server-sent-event byte stream,
//! reassembling lines across TCP chunk boundaries. Non-data fields
//! (`event:`, `id:`, `retry:`, comments) are skipped.

/// Cap on bytes buffered while waiting for a line terminator. A stream
/// that exceeds it is not valid SSE; the buffer is dropped so decoding
/// can recover on the next line.
const MAX_BUFFER: usize = 64 * 1024;

pub(crate) struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feed a chunk of bytes; returns the `data:` payloads of every
    /// line completed by this chunk, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line[..line.len() - 1]) {
                payloads.push(payload);
            }
        }

        if self.buffer.len() > MAX_BUFFER {
            tracing::warn!(
                buffered = self.buffer.len(),
                "Dropping oversized SSE line buffer"
            );
            self.buffer.clear();
        }

        payloads
    }

    /// Flush the remainder as a final unterminated line.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        data_payload(&self.buffer)
    }
}

/// The payload of a `data:` line, or None for any other SSE field.
/// Handles CRLF endings and the optional space after the colon.
fn data_payload(line: &[u8]) -> Option<String> {
    let line = match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    };
    let line = std::str::from_utf8(line).ok()?;
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest).to_string())
}
