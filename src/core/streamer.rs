use crate::domain::model::{ChatMessage, ChatRequest, TokenUsage};
use crate::domain::ports::{ChatModel, ChunkStream};
use crate::utils::error::Result;
use crate::utils::monitor::StreamMonitor;
use futures::StreamExt;
use std::io::Write;

/// What a finished stream produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub text: String,
    pub chunks: usize,
    pub usage: Option<TokenUsage>,
    pub done_reason: Option<String>,
}

/// Write each chunk to `out` as it arrives, flushing after every write.
///
/// Chunks are written back to back with no separator, so the output equals
/// the concatenated reply. An error item ends the stream; whatever was
/// already written stays written.
pub async fn stream_to_writer<W: Write>(
    mut stream: ChunkStream,
    out: &mut W,
    monitor: Option<&StreamMonitor>,
) -> Result<StreamSummary> {
    let mut summary = StreamSummary::default();

    while let Some(item) = stream.next().await {
        let chunk = item?;

        if !chunk.content.is_empty() {
            out.write_all(chunk.content.as_bytes())?;
            out.flush()?;
            summary.text.push_str(&chunk.content);
            summary.chunks += 1;

            if let Some(monitor) = monitor {
                monitor.record_chunk();
            }
        }

        if chunk.done {
            summary.usage = chunk.usage;
            summary.done_reason = chunk.done_reason;
        }
    }

    tracing::debug!(
        "Stream finished: {} chunks, {} chars, reason: {:?}",
        summary.chunks,
        summary.text.len(),
        summary.done_reason
    );

    Ok(summary)
}

/// Send a single user message to `model_name` and stream the reply to `out`.
pub async fn stream_prompt<M, W>(
    model: &M,
    model_name: &str,
    prompt: &str,
    out: &mut W,
    monitor: Option<&StreamMonitor>,
) -> Result<StreamSummary>
where
    M: ChatModel + ?Sized,
    W: Write,
{
    let request = ChatRequest::new(model_name, vec![ChatMessage::user(prompt)]);
    tracing::info!("💬 Streaming reply from {}", model_name);

    let stream = model.stream_chat(&request).await?;
    stream_to_writer(stream, out, monitor).await
}
