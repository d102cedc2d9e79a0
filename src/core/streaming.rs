//! SSE stream decoding for chat-completion responses.
//!
//! The model backend streams completions as Server-Sent Events. Chunks
//! arrive at arbitrary byte boundaries, so the decoder buffers partial
//! lines and yields only complete `data:` frames.

use serde::de::DeserializeOwned;

/// Buffering SSE decoder.
///
/// Feed raw response chunks with [`push`](Self::push); complete frames come
/// back in order, incomplete trailing data stays buffered for the next
/// chunk. The buffer is bounded so a malformed stream cannot grow it
/// without limit.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    const MAX_BUFFER_SIZE: usize = 1024 * 1024;

    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Push a chunk of bytes and extract complete SSE frames.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            tracing::warn!(
                "SSE buffer exceeded {}KB limit, truncating",
                Self::MAX_BUFFER_SIZE / 1024
            );
            let mut keep_from = self.buffer.len() - (Self::MAX_BUFFER_SIZE / 2);
            // The cut point may land inside a multibyte character.
            while !self.buffer.is_char_boundary(keep_from) {
                keep_from += 1;
            }
            self.buffer = self.buffer[keep_from..].to_string();
        }

        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim().to_string();
            self.buffer = self.buffer[pos + 1..].to_string();

            if line.is_empty() {
                continue;
            }

            if let Some(data) = line.strip_prefix("data: ") {
                frames.push(SseFrame {
                    data: data.to_string(),
                });
            }
        }

        frames
    }

    /// Push a string directly (used by tests).
    pub fn push_str(&mut self, s: &str) -> Vec<SseFrame> {
        self.push(s.as_bytes())
    }

    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// One complete `data:` frame, prefix stripped.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    /// The `[DONE]` sentinel that terminates a completion stream.
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }

    /// Parse the frame payload as JSON, `None` on malformed frames.
    pub fn try_parse<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.data).ok()
    }
}
