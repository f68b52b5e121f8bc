//! NDJSON decoding for Ollama chat responses.
//!
//! Ollama emits one JSON object per line. Transport chunks do not line up
//! with lines, so bytes are buffered until a newline arrives; a multi-byte
//! UTF-8 character split across two chunks is reassembled before decoding.

use super::types::ChatResponseLine;
use crate::domain::model::{ChatChunk, TokenUsage};
use crate::domain::ports::ChunkStream;
use crate::utils::error::{ChatError, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};

const DIAGNOSTIC_SNIPPET_CHARS: usize = 500;

/// Decode one NDJSON line into a [`ChatChunk`].
pub fn parse_line(line: &str) -> Result<ChatChunk> {
    let parsed: ChatResponseLine =
        serde_json::from_str(line).map_err(|e| ChatError::StreamError {
            message: format!("invalid NDJSON line: {}", e),
        })?;

    if let Some(error) = parsed.error {
        return Err(ChatError::GenerationError { message: error });
    }

    let usage = if parsed.done {
        Some(TokenUsage {
            prompt_tokens: parsed.prompt_eval_count.unwrap_or(0),
            completion_tokens: parsed.eval_count.unwrap_or(0),
        })
    } else {
        None
    };

    Ok(ChatChunk {
        content: parsed.message.map(|m| m.content).unwrap_or_default(),
        done: parsed.done,
        done_reason: parsed.done_reason,
        usage,
    })
}

/// Concatenate every `message.content` of a complete NDJSON body and trim it.
pub fn collect_reply(body: &str) -> Result<String> {
    let mut content = String::new();

    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        match parse_line(line) {
            Ok(chunk) => content.push_str(&chunk.content),
            Err(e @ ChatError::StreamError { .. }) => {
                let snippet: String = body.chars().take(DIAGNOSTIC_SNIPPET_CHARS).collect();
                tracing::error!(
                    "Invalid NDJSON from Ollama (first {} chars): {}",
                    DIAGNOSTIC_SNIPPET_CHARS,
                    snippet
                );
                return Err(e);
            }
            Err(e) => {
                tracing::error!("❌ Ollama reported an error: {}", e);
                return Err(e);
            }
        }
    }

    Ok(content.trim().to_string())
}

/// Line splitter over raw bytes.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and drain every complete, non-blank line.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = decode_utf8(&raw[..raw.len() - 1])?;
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok(lines)
    }

    /// The trailing line left when the body ends without a newline.
    pub fn finish(&mut self) -> Result<Option<String>> {
        let rest = std::mem::take(&mut self.buf);
        let line = decode_utf8(&rest)?;
        let line = line.trim();
        Ok((!line.is_empty()).then(|| line.to_string()))
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ChatError::StreamError {
        message: format!("UTF-8 decode error: {}", e),
    })
}

/// Turn a response byte stream into a stream of decoded chunks.
///
/// The first error ends the stream.
pub fn chunk_stream<S>(byte_stream: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes_stream = std::pin::pin!(byte_stream);
        let mut buffer = LineBuffer::new();

        while let Some(next) = bytes_stream.next().await {
            let bytes = match next {
                Ok(b) => b,
                Err(e) => {
                    yield Err(ChatError::ApiError(e));
                    return;
                }
            };

            let lines = match buffer.push(&bytes) {
                Ok(lines) => lines,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for line in lines {
                match parse_line(&line) {
                    Ok(chunk) => yield Ok(chunk),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        match buffer.finish() {
            Ok(Some(line)) => yield parse_line(&line),
            Ok(None) => {}
            Err(e) => yield Err(e),
        }
    })
}
