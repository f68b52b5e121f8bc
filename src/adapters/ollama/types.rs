//! Ollama wire types for `/api/chat`, `/api/embeddings` and `/api/version`.

use crate::domain::model::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

#[derive(Debug, Default, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A single NDJSON line of a chat response.
///
/// ```text
/// {"model":"llama3","message":{"role":"assistant","content":"Once"},"done":false}
/// {"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":10,"prompt_eval_count":20}
/// ```
#[derive(Debug, Deserialize)]
pub struct ChatResponseLine {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingRequestBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponseBody {
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct VersionResponseBody {
    pub version: String,
}
